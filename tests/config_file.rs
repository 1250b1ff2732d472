//! Integration tests for loading stream sets from disk

use std::io::Write;

use tempfile::NamedTempFile;
use teleop_frames::config::{Codec, Side, StreamSetConfig, StreamType};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_stream_set() {
    let file = write_config(
        r#"{
            "acquisition": { "max_queued_frames": 6, "idle_backoff_ms": 2 },
            "streams": [
                { "port": 5000, "name": "head", "stream_type": "Stereo", "side": "Both",
                  "width": 2560, "height": 720 },
                { "port": 5001, "name": "gripper", "codec": "H265",
                  "position": { "x": 0.5, "y": -0.2, "z": -1.0 } }
            ]
        }"#,
    );

    let set = StreamSetConfig::from_file(file.path()).unwrap();
    assert_eq!(set.acquisition.max_queued_frames, 6);
    assert_eq!(set.acquisition.idle_backoff_ms, 2);
    assert_eq!(set.acquisition.early_failure_timeout_ms, 10);
    assert_eq!(set.streams.len(), 2);

    let head = &set.streams[0];
    assert_eq!(head.stream_type, StreamType::Stereo);
    assert_eq!(head.side, Side::Both);
    assert_eq!((head.width, head.height), (2560, 720));

    let gripper = &set.streams[1];
    assert_eq!(gripper.codec, Codec::H265);
    assert_eq!(gripper.position.z, -1.0);
    assert_eq!(gripper.scale.x, 1.0);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StreamSetConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.category(), "io");
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_json_is_parse_error() {
    let file = write_config(r#"{ "streams": [ { "port": 5000, "name": } ] }"#);
    let err = StreamSetConfig::from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "parse");
}

#[test]
fn test_invalid_set_is_config_error() {
    let file = write_config(
        r#"{
            "acquisition": { "max_queued_frames": 1 },
            "streams": [ { "port": 5000, "name": "head" } ]
        }"#,
    );
    let err = StreamSetConfig::from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "config");
    assert!(err.to_string().contains("max_queued_frames"));
}
