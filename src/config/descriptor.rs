//! Stream descriptors: the immutable identity of one video stream.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether one decoded frame carries one view or a side-by-side pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamType {
    #[default]
    Mono,
    Stereo,
}

/// Eye selection. Also used as an index into a slot's image pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Left,
    Right,
    Both,
}

impl Side {
    /// Image index for this side. `Both` maps to the left image.
    pub fn index(self) -> usize {
        match self {
            Side::Left | Side::Both => 0,
            Side::Right => 1,
        }
    }

    /// Tag used in placeholder captions.
    pub fn tag(self) -> &'static str {
        match self {
            Side::Left | Side::Both => "[left]",
            Side::Right => "[right]",
        }
    }
}

/// Compression format of the incoming RTP stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Codec {
    #[default]
    H264,
    H265,
    AV1,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::H264 => "H264",
            Codec::H265 => "H265",
            Codec::AV1 => "AV1",
        };
        f.write_str(name)
    }
}

/// Three floats; placement metadata for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

/// Configuration identifying one stream.
///
/// `position` and `scale` are not interpreted here; they are carried for the
/// application that places the stream in its scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    #[serde(default)]
    pub stream_type: StreamType,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub codec: Codec,
    pub port: u16,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    pub name: String,
    /// Nominal width used for placeholders before the real geometry is known.
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl StreamDescriptor {
    /// Mono, left, H264 descriptor at 1280x720.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            stream_type: StreamType::Mono,
            side: Side::Left,
            codec: Codec::H264,
            port,
            position: Vec3::default(),
            scale: Vec3::ONE,
            name: name.into(),
            width: default_width(),
            height: default_height(),
        }
    }

    pub fn stereo(mut self) -> Self {
        self.stream_type = StreamType::Stereo;
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn nominal_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn placement(mut self, position: Vec3, scale: Vec3) -> Self {
        self.position = position;
        self.scale = scale;
        self
    }

    /// `name:port`, used to tag log lines.
    pub fn label(&self) -> String {
        format!("{}:{}", self.name, self.port)
    }

    /// True when one frame is split into a left and a right half.
    pub fn splits_frame(&self) -> bool {
        self.stream_type == StreamType::Stereo && self.side == Side::Both
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let desc: StreamDescriptor =
            serde_json::from_str(r#"{ "port": 5000, "name": "front" }"#).unwrap();
        assert_eq!(desc.stream_type, StreamType::Mono);
        assert_eq!(desc.side, Side::Left);
        assert_eq!(desc.codec, Codec::H264);
        assert_eq!(desc.scale, Vec3::ONE);
        assert_eq!(desc.position, Vec3::default());
        assert_eq!((desc.width, desc.height), (1280, 720));
        assert_eq!(desc, StreamDescriptor::new("front", 5000));
    }

    #[test]
    fn test_full_json() {
        let desc: StreamDescriptor = serde_json::from_str(
            r#"{
                "stream_type": "Stereo", "side": "Both", "codec": "H265",
                "port": 5002, "name": "head",
                "position": { "x": 0.0, "y": 1.5, "z": -2.0 },
                "width": 2560, "height": 720
            }"#,
        )
        .unwrap();
        assert!(desc.splits_frame());
        assert_eq!(desc.codec, Codec::H265);
        assert_eq!(desc.position.y, 1.5);
        assert_eq!(desc.label(), "head:5002");
    }

    #[test]
    fn test_side_index() {
        assert_eq!(Side::Left.index(), 0);
        assert_eq!(Side::Both.index(), 0);
        assert_eq!(Side::Right.index(), 1);
        assert_eq!(Side::Right.tag(), "[right]");
    }

    #[test]
    fn test_stereo_single_side_does_not_split() {
        let desc = StreamDescriptor::new("cam", 5000).stereo().side(Side::Right);
        assert!(!desc.splits_frame());
    }
}
