use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{FrameSource, FrameSourceError, SourceInfo};
use crate::capture::session_preset::SessionPreset;
use crate::shared::frame::Frame;

const EIO: i32 = 5;
const ENODEV: i32 = 19;

/// Live frames via libavdevice, or any file/URL libavformat can open.
///
/// With an input format (`v4l2`, `avfoundation`, `dshow`, ...) the input is
/// handed to that device demuxer together with the preset's `video_size`.
/// Without one the input is probed like a regular media file.
pub struct FfmpegFrameSource {
    input: String,
    input_format: Option<String>,
    preset: SessionPreset,
    paced: bool,
    state: Option<DecodeState>,
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    frame_interval: Option<Duration>,
    last_delivery: Option<Instant>,
    frame_index: usize,
    flushing: bool,
}

// Safety: the source is opened, read and closed from one thread at a time.
// The raw pointers inside ffmpeg types are never shared.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            input_format: None,
            preset: SessionPreset::default(),
            paced: false,
            state: None,
        }
    }

    pub fn with_input_format(mut self, format: Option<String>) -> Self {
        self.input_format = format;
        self
    }

    pub fn with_preset(mut self, preset: SessionPreset) -> Self {
        self.preset = preset;
        self
    }

    /// Deliver file input at its native frame rate, the way a camera would.
    pub fn with_pacing(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn is_device(&self) -> bool {
        self.input_format.is_some()
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, FrameSourceError> {
        let Some(format_name) = self.input_format.as_deref() else {
            return ffmpeg_next::format::input(&self.input).map_err(|e| open_error(&self.input, e));
        };

        ffmpeg_next::device::register_all();
        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == format_name)
            .ok_or_else(|| {
                FrameSourceError::Configuration(format!("unknown input format '{format_name}'"))
            })?;

        let mut options = ffmpeg_next::Dictionary::new();
        if let Some((w, h)) = self.preset.dimensions() {
            options.set("video_size", &format!("{w}x{h}"));
        }

        match ffmpeg_next::format::open_with(&self.input, &format, options) {
            Ok(ffmpeg_next::format::context::Context::Input(ictx)) => Ok(ictx),
            Ok(_) => Err(FrameSourceError::Configuration(format!(
                "'{format_name}' is not an input format"
            ))),
            Err(e) => Err(open_error(&self.input, e)),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self) -> Result<SourceInfo, FrameSourceError> {
        ffmpeg_next::init().map_err(|e| FrameSourceError::Configuration(e.to_string()))?;
        let ictx = self.open_input()?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| {
                FrameSourceError::Configuration(format!("no video stream in '{}'", self.input))
            })?;
        let stream_index = stream.index();

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| FrameSourceError::Configuration(e.to_string()))?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| FrameSourceError::Configuration(e.to_string()))?;

        let frame_interval = (self.paced && !self.is_device() && fps > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / fps));

        let info = SourceInfo {
            width,
            height,
            fps,
            name: ictx.format().name().to_string(),
        };
        log::info!(
            "Opened '{}' ({}) at {}x{} {:.1} fps",
            self.input,
            info.name,
            width,
            height,
            fps
        );

        self.state = Some(DecodeState {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            frame_interval,
            last_delivery: None,
            frame_index: 0,
            flushing: false,
        });
        Ok(info)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        let Some(state) = self.state.as_mut() else {
            return Err(FrameSourceError::Runtime("source is not open".into()));
        };
        let frame = state.decode_next()?;
        if frame.is_some() {
            state.pace();
        }
        Ok(frame)
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Closed '{}'", self.input);
        }
    }

    fn supports_preset(&self, preset: SessionPreset) -> bool {
        // Files come at whatever size they were recorded.
        self.is_device() || preset.dimensions().is_none()
    }
}

impl DecodeState {
    fn receive(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb)
            .map_err(|e| FrameSourceError::Runtime(e.to_string()))?;

        let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn decode_next(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if let Some(frame) = self.receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    return self.receive();
                }
                Err(e) => return Err(read_error(e)),
            }

            if packet.stream() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        if let Some(last) = self.last_delivery {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_delivery = Some(Instant::now());
    }
}

fn open_error(input: &str, e: ffmpeg_next::Error) -> FrameSourceError {
    if let ffmpeg_next::Error::Other { errno } = e {
        let io = std::io::Error::from_raw_os_error(errno);
        if io.kind() == std::io::ErrorKind::PermissionDenied {
            return FrameSourceError::NotAuthorized(format!("{input}: {io}"));
        }
    }
    FrameSourceError::Configuration(format!("{input}: {e}"))
}

fn read_error(e: ffmpeg_next::Error) -> FrameSourceError {
    match e {
        ffmpeg_next::Error::Other { errno } if errno == EIO || errno == ENODEV => {
            FrameSourceError::Reset(e.to_string())
        }
        ffmpeg_next::Error::Other { errno } => {
            let kind = std::io::Error::from_raw_os_error(errno).kind();
            if matches!(
                kind,
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
            ) {
                FrameSourceError::Interrupted(e.to_string())
            } else {
                FrameSourceError::Runtime(e.to_string())
            }
        }
        other => FrameSourceError::Runtime(other.to_string()),
    }
}

/// Copies an RGB24 frame into a tightly packed buffer, dropping row padding.
fn extract_rgb_pixels(
    rgb: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
