//! Capture-backend boundary: traits for the OS capture collaborators,
//! plus mock and WAV-file implementations used by tests and pipe mode.

use crate::audio::frame::{AudioFrame, Samples};
use crate::error::{LivecapError, Result};

/// Channel over which a capture backend delivers raw frames.
///
/// Backends push from their own delivery thread; the router drains the
/// receiving side on its forwarding thread.
pub type FrameSink = crossbeam_channel::Sender<AudioFrame>;

/// One capture backend variant (microphone or system audio).
///
/// `start` while started is a no-op. Dropping or stopping a backend must
/// release every clone of the sink it was given, so the router's channel
/// disconnects and its forwarding thread can exit.
pub trait CaptureBackend: Send {
    /// Begin delivering raw frames into the sink.
    fn start(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop delivering frames and release the sink.
    fn stop(&mut self) -> Result<()>;
}

/// A named capturable entity exposed by the system-capture collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub name: String,
    /// Process identity of the owning application (0 when the target is
    /// a device rather than a process).
    pub pid: u32,
}

impl CaptureTarget {
    pub fn new(name: impl Into<String>, pid: u32) -> Self {
        Self {
            name: name.into(),
            pid,
        }
    }
}

/// Boundary to the OS system-audio capture service.
///
/// The production implementation captures loopback/monitor streams; the
/// mock scripts targets and frames for tests.
pub trait SystemCapture: Send {
    /// Whether capture is currently authorized.
    fn has_permission(&self) -> bool;

    /// Request authorization; returns the resulting state.
    fn request_permission(&mut self) -> bool {
        self.has_permission()
    }

    /// Enumerate capturable targets.
    fn targets(&self) -> Result<Vec<CaptureTarget>>;

    /// Open a capture stream for the given target, or the primary output
    /// when `None`, delivering audio frames into the sink.
    fn open(&mut self, target: Option<&CaptureTarget>, sink: FrameSink) -> Result<()>;

    /// Tear down the capture stream.
    fn close(&mut self) -> Result<()>;
}

/// Mock capture backend with scripted frames.
#[derive(Debug, Clone, Default)]
pub struct MockCaptureBackend {
    frames: Vec<AudioFrame>,
    should_fail_start: bool,
    started: bool,
}

impl MockCaptureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver these frames, in order, when started.
    pub fn with_frames(mut self, frames: Vec<AudioFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Fail the next `start` call.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.started {
            return Ok(());
        }
        if self.should_fail_start {
            return Err(LivecapError::Capture {
                message: "mock capture failure".to_string(),
            });
        }
        for frame in self.frames.drain(..) {
            // Receiver gone means the router already tore down
            if sink.send(frame).is_err() {
                break;
            }
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }
}

/// Mock system-capture collaborator with scripted targets and permission.
#[derive(Debug, Clone)]
pub struct MockSystemCapture {
    permission: bool,
    grant_on_request: bool,
    targets: Vec<CaptureTarget>,
    frames: Vec<AudioFrame>,
    opened_target: Option<Option<CaptureTarget>>,
    fail_open: bool,
}

impl Default for MockSystemCapture {
    fn default() -> Self {
        Self {
            permission: true,
            grant_on_request: false,
            targets: Vec::new(),
            frames: Vec::new(),
            opened_target: None,
            fail_open: false,
        }
    }
}

impl MockSystemCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(mut self, targets: Vec<CaptureTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_frames(mut self, frames: Vec<AudioFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Start unauthorized; `grant` controls whether a permission request
    /// succeeds.
    pub fn without_permission(mut self, grant: bool) -> Self {
        self.permission = false;
        self.grant_on_request = grant;
        self
    }

    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// The target the last `open` call resolved to, if any.
    pub fn opened_target(&self) -> Option<&Option<CaptureTarget>> {
        self.opened_target.as_ref()
    }
}

impl SystemCapture for MockSystemCapture {
    fn has_permission(&self) -> bool {
        self.permission
    }

    fn request_permission(&mut self) -> bool {
        if self.grant_on_request {
            self.permission = true;
        }
        self.permission
    }

    fn targets(&self) -> Result<Vec<CaptureTarget>> {
        Ok(self.targets.clone())
    }

    fn open(&mut self, target: Option<&CaptureTarget>, sink: FrameSink) -> Result<()> {
        if self.fail_open {
            return Err(LivecapError::Capture {
                message: "mock open failure".to_string(),
            });
        }
        self.opened_target = Some(target.cloned());
        for frame in self.frames.drain(..) {
            if sink.send(frame).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Capture backend that replays a WAV file as raw frames.
///
/// Used by pipe mode and tests; chunked so the normalizer and router see
/// the same frame cadence a live backend would produce.
pub struct WavCaptureBackend {
    frames: Vec<AudioFrame>,
}

impl WavCaptureBackend {
    /// Samples per emitted frame (per channel).
    const CHUNK_FRAMES: usize = 1024;

    /// Parse WAV data from any reader into a replayable backend.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut wav = hound::WavReader::new(reader).map_err(|e| LivecapError::Capture {
            message: format!("failed to parse WAV input: {}", e),
        })?;
        let spec = wav.spec();

        let samples: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int => wav
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| LivecapError::Capture {
                    message: format!("failed to read WAV samples: {}", e),
                })?,
            hound::SampleFormat::Float => wav
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| LivecapError::Capture {
                    message: format!("failed to read WAV samples: {}", e),
                })?,
        };

        let chunk_len = Self::CHUNK_FRAMES * spec.channels as usize;
        let frames = samples
            .chunks(chunk_len.max(1))
            .map(|chunk| {
                AudioFrame::new(
                    Samples::I16(chunk.to_vec()),
                    spec.sample_rate,
                    spec.channels,
                )
            })
            .collect();

        Ok(Self { frames })
    }

    /// Open and parse a WAV file.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

impl CaptureBackend for WavCaptureBackend {
    fn start(&mut self, sink: FrameSink) -> Result<()> {
        for frame in self.frames.drain(..) {
            if sink.send(frame).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
