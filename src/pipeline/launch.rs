//! Launch descriptions for the receive/decode graph.

use crate::config::Codec;

/// Name of the converter element for `port`.
pub fn converter_name(port: u16) -> String {
    format!("videoconvert{}", port)
}

/// Name of the application sink for `port`.
pub fn sink_name(port: u16) -> String {
    format!("appsink{}", port)
}

fn depayloader(codec: Codec) -> &'static str {
    match codec {
        Codec::H264 => "rtph264depay",
        Codec::H265 => "rtph265depay",
        Codec::AV1 => "rtpav1depay",
    }
}

/// RTP over UDP on `port`, depayloaded, decoded and converted to packed RGB.
pub fn launch_description(port: u16, codec: Codec) -> String {
    format!(
        "udpsrc port={port} \
         caps=\"application/x-rtp,media=video,clock-rate=90000,payload=96,encoding-name={codec}\" \
         ! {depay} ! decodebin3 ! videoconvert name={convert} \
         ! video/x-raw,format=RGB ! appsink name={sink}",
        port = port,
        codec = codec,
        depay = depayloader(codec),
        convert = converter_name(port),
        sink = sink_name(port),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h264_description() {
        assert_eq!(
            launch_description(5000, Codec::H264),
            "udpsrc port=5000 caps=\"application/x-rtp,media=video,clock-rate=90000,payload=96,encoding-name=H264\" \
             ! rtph264depay ! decodebin3 ! videoconvert name=videoconvert5000 \
             ! video/x-raw,format=RGB ! appsink name=appsink5000"
        );
    }

    #[test]
    fn test_codec_selects_depayloader() {
        let h265 = launch_description(6000, Codec::H265);
        assert!(h265.contains("encoding-name=H265"));
        assert!(h265.contains("! rtph265depay !"));

        let av1 = launch_description(6001, Codec::AV1);
        assert!(av1.contains("encoding-name=AV1"));
        assert!(av1.contains("! rtpav1depay !"));
    }

    #[test]
    fn test_element_names_carry_port() {
        assert_eq!(converter_name(5001), "videoconvert5001");
        assert_eq!(sink_name(5001), "appsink5001");
    }
}
