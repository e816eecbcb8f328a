//! Frame types flowing through the capture pipeline.

use crate::defaults;

/// Interleaved PCM samples in one of the formats capture backends produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    I16(Vec<i16>),
    F32(Vec<f32>),
}

impl Samples {
    /// Number of individual samples across all channels.
    pub fn len(&self) -> usize {
        match self {
            Samples::I16(s) => s.len(),
            Samples::F32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short format tag for error messages.
    pub fn format_tag(&self) -> &'static str {
        match self {
            Samples::I16(_) => "i16",
            Samples::F32(_) => "f32",
        }
    }
}

/// A raw buffer of interleaved PCM as delivered by a capture backend.
///
/// Consumed exactly once by the format normalizer; never retained past
/// that call.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Samples,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Samples, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of per-channel frames in this buffer.
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// The input format key this frame carries, used by the normalizer
    /// to detect mid-session format changes.
    pub fn format(&self) -> InputFormat {
        InputFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            tag: self.samples.format_tag(),
        }
    }
}

/// Format metadata identifying a capture backend's output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub tag: &'static str,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ch/{}Hz/{}", self.channels, self.sample_rate, self.tag)
    }
}

/// A PCM buffer in the canonical recognition format: mono f32 at 16kHz.
///
/// Every normalized frame within one session carries the same format.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub samples: Vec<f32>,
}

impl NormalizedFrame {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// Duration of this frame in milliseconds at the canonical rate.
    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u32 * 1000) / defaults::TARGET_SAMPLE_RATE
    }
}
