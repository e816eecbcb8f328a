//! System/application audio capture backend.
//!
//! Enumerates capturable targets through the [`SystemCapture`] boundary,
//! narrows them to communication apps (falling back to the full list when
//! nothing matches), resolves the configured selection, and opens a
//! loopback stream whose frames feed the router like any other backend.

use crate::audio::frame::{AudioFrame, Samples};
use crate::audio::source::{CaptureBackend, CaptureTarget, FrameSink, SystemCapture};
use crate::defaults;
use crate::error::{LivecapError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Narrow targets to known communication apps, case-insensitively.
///
/// When no target matches the filter, the full list is returned instead
/// so the user can still pick something.
pub fn filter_communication_targets(targets: &[CaptureTarget]) -> Vec<CaptureTarget> {
    let filtered: Vec<CaptureTarget> = targets
        .iter()
        .filter(|t| {
            let lower = t.name.to_lowercase();
            defaults::COMMUNICATION_APPS
                .iter()
                .any(|app| lower.contains(app))
        })
        .cloned()
        .collect();

    if filtered.is_empty() {
        targets.to_vec()
    } else {
        filtered
    }
}

/// System-audio capture backend.
///
/// Generic over the [`SystemCapture`] collaborator so tests can script
/// targets, permission, and frames.
pub struct SystemAudioBackend<C: SystemCapture> {
    capture: C,
    /// Name substring selecting a specific application target.
    selection: Option<String>,
    capturing: bool,
}

impl<C: SystemCapture> SystemAudioBackend<C> {
    pub fn new(capture: C, selection: Option<String>) -> Self {
        Self {
            capture,
            selection,
            capturing: false,
        }
    }

    /// Capturable targets after the communication-app filter.
    pub fn available_targets(&self) -> Result<Vec<CaptureTarget>> {
        Ok(filter_communication_targets(&self.capture.targets()?))
    }

    fn resolve_target(&self) -> Result<Option<CaptureTarget>> {
        let Some(wanted) = &self.selection else {
            return Ok(None); // Primary output
        };

        let wanted_lower = wanted.to_lowercase();
        let targets = self.available_targets()?;
        let found = targets
            .into_iter()
            .find(|t| t.name.to_lowercase().contains(&wanted_lower));

        match found {
            Some(target) => Ok(Some(target)),
            None => Err(LivecapError::ResourceUnavailable {
                message: format!("no capturable target matches \"{}\"", wanted),
            }),
        }
    }
}

impl<C: SystemCapture> CaptureBackend for SystemAudioBackend<C> {
    fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.capturing {
            return Ok(());
        }

        if !self.capture.has_permission() && !self.capture.request_permission() {
            return Err(LivecapError::PermissionDenied {
                message: "system audio capture is not authorized".to_string(),
            });
        }

        let target = self.resolve_target()?;
        self.capture.open(target.as_ref(), sink)?;
        self.capturing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }
        self.capture.close()?;
        self.capturing = false;
        Ok(())
    }
}

/// Wrapper for cpal::Stream to make it Send (see microphone.rs).
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Production [`SystemCapture`] implementation over loopback devices.
///
/// Monitor/loopback cpal devices are what PipeWire and PulseAudio expose
/// for "what the system is playing"; each one is offered as a capturable
/// target. Per-application streams are the OS capture service's business,
/// not ours.
#[derive(Default)]
pub struct LoopbackCapture {
    stream: Option<SendableStream>,
}

impl LoopbackCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn loopback_devices() -> Result<Vec<(String, cpal::Device)>> {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| LivecapError::Capture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

        let mut found = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                let lower = name.to_lowercase();
                if lower.contains("monitor") || lower.contains("loopback") {
                    found.push((name, device));
                }
            }
        }
        Ok(found)
    }

    fn open_device(&mut self, device: cpal::Device, sink: FrameSink) -> Result<()> {
        use cpal::SampleFormat;

        let default_config = device
            .default_input_config()
            .map_err(|e| LivecapError::Capture {
                message: format!("Failed to query loopback config: {}", e),
            })?;

        let sample_rate = default_config.sample_rate();
        let channels = default_config.channels();
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let err_callback = |err| {
            eprintln!("livecap: loopback stream error: {}", err);
        };

        let stream = match default_config.sample_format() {
            SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let frame =
                            AudioFrame::new(Samples::F32(data.to_vec()), sample_rate, channels);
                        let _ = sink.send(frame);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| LivecapError::Capture {
                    message: format!("Failed to build loopback stream: {}", e),
                })?,
            SampleFormat::I16 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let frame =
                            AudioFrame::new(Samples::I16(data.to_vec()), sample_rate, channels);
                        let _ = sink.send(frame);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| LivecapError::Capture {
                    message: format!("Failed to build loopback stream: {}", e),
                })?,
            fmt => {
                return Err(LivecapError::Capture {
                    message: format!("Unsupported loopback sample format: {:?}", fmt),
                })
            }
        };

        stream.play().map_err(|e| LivecapError::Capture {
            message: format!("Failed to start loopback stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }
}

impl SystemCapture for LoopbackCapture {
    fn has_permission(&self) -> bool {
        // Loopback capture needs no extra authorization on this platform;
        // the permission primitive exists for capture services that do.
        true
    }

    fn targets(&self) -> Result<Vec<CaptureTarget>> {
        Ok(Self::loopback_devices()?
            .into_iter()
            .map(|(name, _)| CaptureTarget::new(name, 0))
            .collect())
    }

    fn open(&mut self, target: Option<&CaptureTarget>, sink: FrameSink) -> Result<()> {
        let devices = Self::loopback_devices()?;

        let device = match target {
            Some(target) => {
                devices
                    .into_iter()
                    .find(|(name, _)| *name == target.name)
                    .map(|(_, d)| d)
                    .ok_or_else(|| LivecapError::ResourceUnavailable {
                        message: format!("\"{}\" has no capturable stream", target.name),
                    })?
            }
            None => {
                // Primary output: the first monitor device
                devices
                    .into_iter()
                    .next()
                    .map(|(_, d)| d)
                    .ok_or_else(|| LivecapError::ResourceUnavailable {
                        message: "no monitor/loopback device found".to_string(),
                    })?
            }
        };

        self.open_device(device, sink)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.0.pause().map_err(|e| LivecapError::Capture {
                message: format!("Failed to stop loopback stream: {}", e),
            })?;
        }
        Ok(())
    }
}
