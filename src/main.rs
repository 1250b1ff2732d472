use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{info, warn};
use teleop_frames::StreamPipeline;
use teleop_frames::config::{Codec, Side, StreamDescriptor, StreamSetConfig, StreamType};
use teleop_frames::logging::init_logging;

/// Receive teleop video streams and poll them like a render loop would.
#[derive(Parser, Debug)]
#[command(name = "teleop-view")]
#[command(about = "Receive RTP video streams and report the frames a renderer would see")]
#[command(long_about = "Starts one decode pipeline per stream, polls the latest frame at a fixed tick rate
and logs frame geometry, origin and queue statistics. Streams come from a JSON stream-set
file or from a single stream described on the command line.")]
struct Args {
    /// JSON stream-set file
    #[arg(short, long, help = "Stream-set JSON file (replaces the single-stream flags)")]
    config: Option<PathBuf>,

    /// UDP port of a single stream
    #[arg(short, long, default_value_t = 5000, help = "UDP port to receive RTP on")]
    port: u16,

    #[arg(short, long, default_value = "stream", help = "Display name of the stream")]
    name: String,

    #[arg(long, help = "Treat frames as side-by-side stereo")]
    stereo: bool,

    #[arg(long, default_value = "left", help = "Eye to read: left, right or both")]
    side: String,

    #[arg(long, default_value = "h264", help = "RTP payload codec: h264, h265 or av1")]
    codec: String,

    #[arg(long, default_value_t = 1280, help = "Nominal width used for placeholders")]
    width: u32,

    #[arg(long, default_value_t = 720, help = "Nominal height used for placeholders")]
    height: u32,

    /// How long to run
    #[arg(short, long, default_value = "10s",
          help = "How long to poll: 30s (30 seconds), 2m (2 minutes), 1h (1 hour)")]
    duration: String,

    #[arg(short, long, default_value_t = 72, help = "Polls per second, like a display refresh")]
    tick_rate: u32,

    #[arg(long, help = "Override the frame queue bound (3-64)")]
    max_queued_frames: Option<usize>,

    #[arg(long, help = "TTF/OTF font for placeholder captions")]
    font: Option<PathBuf>,

    #[arg(long, help = "Log filter when RUST_LOG is unset (default: info)")]
    log: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_deref());

    let run_for = Duration::from_secs(parse_duration(&args.duration)?);
    if args.tick_rate == 0 {
        return Err(anyhow!("tick rate must be greater than 0"));
    }
    let tick = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    let mut set = match &args.config {
        Some(path) => StreamSetConfig::from_file(path)
            .with_context(|| format!("loading stream set {}", path.display()))?,
        None => StreamSetConfig::new(vec![single_stream(&args)?]),
    };
    if let Some(bound) = args.max_queued_frames {
        set.acquisition.max_queued_frames = bound;
    }
    if args.font.is_some() {
        set.acquisition.caption_font = args.font.clone();
    }
    set.validate().context("invalid stream configuration")?;

    let streams: Vec<StreamPipeline> = set
        .streams
        .iter()
        .cloned()
        .map(|descriptor| StreamPipeline::with_config(descriptor, &set.acquisition))
        .collect();
    info!(
        "polling {} stream(s) at {} Hz for {:?}",
        streams.len(),
        args.tick_rate,
        run_for
    );

    let started = Instant::now();
    let mut last_report = started;
    while started.elapsed() < run_for {
        let tick_started = Instant::now();
        for stream in &streams {
            poll(stream);
        }
        if last_report.elapsed() >= Duration::from_secs(1) {
            streams.iter().for_each(report);
            last_report = Instant::now();
        }
        if let Some(rest) = tick.checked_sub(tick_started.elapsed()) {
            thread::sleep(rest);
        }
    }

    streams.iter().for_each(report);
    for mut stream in streams {
        stream.stop();
        stream.join();
    }
    Ok(())
}

fn single_stream(args: &Args) -> Result<StreamDescriptor> {
    let mut descriptor = StreamDescriptor::new(args.name.clone(), args.port)
        .side(parse_side(&args.side)?)
        .codec(parse_codec(&args.codec)?)
        .nominal_size(args.width, args.height);
    if args.stereo {
        descriptor = descriptor.stereo();
    }
    Ok(descriptor)
}

/// Reads images the way a renderer does once per frame.
fn poll(stream: &StreamPipeline) {
    if stream.stream_type() == StreamType::Stereo && stream.side() == Side::Both {
        let _left = stream.get_image(Side::Left);
        let _right = stream.get_image(Side::Right);
    } else {
        let _image = stream.get_image(stream.side());
    }
}

fn report(stream: &StreamPipeline) {
    let image = stream.get_image(stream.side());
    let stats = stream.stats();
    let geometry = stream
        .geometry()
        .dimensions()
        .map(|(w, h)| format!("{}x{}", w, h))
        .unwrap_or_else(|| "unknown".to_string());

    info!(
        "{}:{} state={:?} geometry={} image={}x{} origin={:?} queued={:?} frames={} errors={} eos={} unavailable={} evictions={} trims={}",
        stream.name(),
        stream.port(),
        stream.state(),
        geometry,
        image.width(),
        image.height(),
        stream.front_origin(),
        stream.queued_origins(),
        stats.frames,
        stats.stream_errors,
        stats.end_of_stream,
        stats.unavailable,
        stats.evictions,
        stats.consumer_trims,
    );
    if let Some(failure) = stream.failure() {
        warn!("{}:{} {}", stream.name(), stream.port(), failure);
    }
}

/// Parse duration string like "30s", "2m", "1h" into seconds
fn parse_duration(duration: &str) -> Result<u64> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(seconds);
    }

    let Some((split, unit)) = duration.char_indices().last() else {
        return Err(anyhow!("Invalid duration format: {}", duration));
    };
    let num_str = &duration[..split];
    if num_str.is_empty() {
        return Err(anyhow!("Invalid duration format: {}", duration));
    }
    let num: u64 = num_str
        .parse()
        .map_err(|_| anyhow!("Invalid number in duration: {}", num_str))?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => {
            return Err(anyhow!(
                "Invalid duration unit: {}. Use 's' for seconds, 'm' for minutes, 'h' for hours",
                unit
            ));
        }
    };
    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow!("Duration too large: {}", duration))
}

fn parse_side(side: &str) -> Result<Side> {
    match side.to_lowercase().as_str() {
        "left" => Ok(Side::Left),
        "right" => Ok(Side::Right),
        "both" => Ok(Side::Both),
        _ => Err(anyhow!("Invalid side: {}. Use: left, right, both", side)),
    }
}

fn parse_codec(codec: &str) -> Result<Codec> {
    match codec.to_lowercase().as_str() {
        "h264" => Ok(Codec::H264),
        "h265" | "hevc" => Ok(Codec::H265),
        "av1" => Ok(Codec::AV1),
        _ => Err(anyhow!("Invalid codec: {}. Use: h264, h265, av1", codec)),
    }
}
