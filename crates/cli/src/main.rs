mod commands;
mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use facecam_core::capture::domain::camera_authorizer::{AlwaysAuthorized, CameraAuthorizer};
use facecam_core::capture::domain::frame_source::FrameSource;
use facecam_core::capture::infrastructure::device_authorizer::DeviceAuthorizer;
use facecam_core::capture::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use facecam_core::capture::session_preset::{available_presets, SessionPreset};
use facecam_core::detection::domain::detection_request::DetectionMode;
use facecam_core::detection::domain::face_detector::FaceDetector;
use facecam_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facecam_core::identification::infrastructure::http_identification_client::HttpIdentificationClient;
use facecam_core::identification::name_label::LabelOrdering;
use facecam_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facecam_core::overlay::infrastructure::log_overlay_renderer::LogOverlayRenderer;
use facecam_core::overlay::infrastructure::snapshot_overlay_renderer::SnapshotOverlayRenderer;
use facecam_core::pipeline::frame_processor::CropArchive;
use facecam_core::pipeline::viewfinder::{Viewfinder, ViewfinderComponents, ViewfinderConfig};
use facecam_core::pipeline::viewfinder_logger::StdoutViewfinderLogger;
use facecam_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use facecam_core::shared::model_resolver;
use facecam_core::shared::orientation::{CameraPosition, DeviceOrientation};
use facecam_core::video::infrastructure::image_file_writer::ImageFileWriter;

use settings::Settings;

/// Face detection viewfinder with remote identification.
#[derive(Parser)]
#[command(name = "facecam")]
struct Cli {
    /// Capture device (e.g. /dev/video0, or "0" with avfoundation) or a
    /// video file to replay as a camera.
    input: String,

    /// Device demuxer for live capture: v4l2, avfoundation, dshow.
    #[arg(long)]
    input_format: Option<String>,

    /// Identification server base URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Detection mode: rectangles or landmarks.
    #[arg(long)]
    mode: Option<DetectionMode>,

    /// Camera position: front or back.
    #[arg(long)]
    camera: Option<CameraPosition>,

    /// Device orientation at startup.
    #[arg(long, default_value = "portrait")]
    orientation: DeviceOrientation,

    /// Capture preset (low, medium, high, 640x480, 1920x1080, ...).
    #[arg(long, default_value = "high")]
    preset: SessionPreset,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Which identification result the label shows: latest-issued or last-completed.
    #[arg(long)]
    label_ordering: Option<LabelOrdering>,

    /// Save overlay snapshots to this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Save one overlay snapshot every N frames.
    #[arg(long, default_value = "30")]
    snapshot_interval: usize,

    /// Keep a copy of every submitted face crop in this directory.
    #[arg(long)]
    crop_dir: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Print the presets the input supports and exit.
    #[arg(long)]
    list_presets: bool,

    /// Write the effective settings as the new defaults.
    #[arg(long)]
    save_settings: bool,

    /// Accept runtime commands on stdin (mode, orientation, stop, start,
    /// status, quit).
    #[arg(long)]
    interactive: bool,
}

impl Cli {
    /// Flags given on the command line win over stored settings.
    fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(camera) = self.camera {
            settings.camera = camera;
        }
        if let Some(confidence) = self.confidence {
            settings.confidence = confidence;
        }
        if let Some(ordering) = self.label_ordering {
            settings.label_ordering = ordering;
        }
        if self.input_format.is_some() {
            settings.input_format = self.input_format.clone();
        }
        settings
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = cli.apply_to(Settings::load());
    if cli.save_settings {
        settings.save()?;
        log::info!("Settings saved");
    }

    let source = build_source(&cli, &settings);
    if cli.list_presets {
        for preset in available_presets(&source) {
            println!("{preset}");
        }
        return Ok(());
    }
    validate(&cli, &settings, &source)?;

    let detector = build_detector(settings.confidence)?;
    let client = HttpIdentificationClient::new(&settings.endpoint)?;
    log::info!("Submitting face crops to {}", client.url());

    let crop_archive = cli
        .crop_dir
        .as_ref()
        .map(|dir| CropArchive::new(Box::new(ImageFileWriter::new()), dir));

    let config = ViewfinderConfig {
        camera: settings.camera,
        mode: settings.mode,
        label_ordering: settings.label_ordering,
        frame_limit: cli.max_frames,
        initial_orientation: cli.orientation,
    };
    let components = ViewfinderComponents {
        source: Box::new(source),
        authorizer: build_authorizer(&cli.input),
        detector,
        client: Arc::new(client),
        renderer: build_renderer(cli.snapshot_dir.as_deref(), cli.snapshot_interval),
        logger: Box::new(StdoutViewfinderLogger::default()),
        crop_archive,
    };

    let mut viewfinder = Viewfinder::new(config, components);
    if cli.interactive {
        eprintln!("{}", commands::HELP);
        commands::spawn_stdin_reader(viewfinder.control());
    }
    viewfinder.start();
    viewfinder.run_ui();
    viewfinder.shutdown();

    if let Some(alert) = viewfinder.alerts().first() {
        return Err(alert.message().into());
    }
    if viewfinder.label().is_hidden() {
        log::info!("No face identified");
    } else {
        log::info!("Last identified: {}", viewfinder.label().text());
    }
    Ok(())
}

fn build_source(cli: &Cli, settings: &Settings) -> FfmpegFrameSource {
    let source = FfmpegFrameSource::new(cli.input.clone())
        .with_input_format(settings.input_format.clone())
        .with_preset(cli.preset);
    // Files are replayed at their native rate; devices pace themselves.
    let paced = !source.is_device();
    source.with_pacing(paced)
}

fn build_authorizer(input: &str) -> Box<dyn CameraAuthorizer> {
    if input.starts_with("/dev/") {
        Box::new(DeviceAuthorizer::new(input))
    } else {
        Box::new(AlwaysAuthorized)
    }
}

fn build_renderer(snapshot_dir: Option<&Path>, interval: usize) -> Box<dyn OverlayRenderer> {
    match snapshot_dir {
        Some(dir) => Box::new(SnapshotOverlayRenderer::new(
            Box::new(ImageFileWriter::new()),
            dir,
            interval,
        )),
        None => Box::new(LogOverlayRenderer::new()),
    }
}

fn build_detector(confidence: f64) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    Ok(Box::new(OnnxYoloDetector::new(&model_path, confidence)?))
}

fn validate(
    cli: &Cli,
    settings: &Settings,
    source: &FfmpegFrameSource,
) -> Result<(), Box<dyn std::error::Error>> {
    if !source.is_device() && !Path::new(&cli.input).exists() {
        return Err(format!("Input file not found: {}", cli.input).into());
    }
    if !(0.0..=1.0).contains(&settings.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            settings.confidence
        )
        .into());
    }
    if !source.supports_preset(cli.preset) {
        return Err(format!(
            "Preset '{}' is not available for this input (see --list-presets)",
            cli.preset
        )
        .into());
    }
    if cli.snapshot_interval == 0 {
        return Err("Snapshot interval must be at least 1".into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
