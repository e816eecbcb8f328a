//! Format normalizer: arbitrary captured PCM → mono f32 at 16kHz.

use crate::audio::frame::{AudioFrame, InputFormat, NormalizedFrame, Samples};
use crate::defaults;
use crate::error::{LivecapError, Result};

/// Converter state bound to one observed input format.
#[derive(Debug, Clone)]
struct Converter {
    format: InputFormat,
    /// Source samples consumed per output sample.
    step: f64,
}

impl Converter {
    fn for_format(format: InputFormat) -> Result<Self> {
        if format.channels == 0 {
            return Err(LivecapError::Conversion {
                message: format!("cannot build converter for {}: no channels", format),
            });
        }
        if format.sample_rate == 0 {
            return Err(LivecapError::Conversion {
                message: format!("cannot build converter for {}: zero sample rate", format),
            });
        }
        Ok(Self {
            format,
            step: format.sample_rate as f64 / defaults::TARGET_SAMPLE_RATE as f64,
        })
    }
}

/// Converts capture-backend frames into the canonical recognition format.
///
/// The converter is derived from the first frame seen and cached; if a
/// later frame arrives in a different format the converter is rebuilt
/// for the new format rather than silently reusing the stale one. A
/// frame that cannot be converted is dropped with an error and does not
/// poison the cached state for subsequent frames.
#[derive(Debug, Default)]
pub struct FormatNormalizer {
    converter: Option<Converter>,
}

impl FormatNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts one frame, consuming it.
    pub fn normalize(&mut self, frame: AudioFrame) -> Result<NormalizedFrame> {
        let format = frame.format();
        let rebuild = match &self.converter {
            Some(c) => c.format != format,
            None => true,
        };
        if rebuild {
            self.converter = Some(Converter::for_format(format)?);
        }
        // Converter presence established above
        let Some(converter) = &self.converter else {
            return Err(LivecapError::Conversion {
                message: "converter unavailable".to_string(),
            });
        };

        let mono = mix_to_mono(&frame);
        Ok(NormalizedFrame::new(resample(&mono, converter.step)))
    }

    /// Drops the cached converter; the next frame re-derives it.
    pub fn reset(&mut self) {
        self.converter = None;
    }
}

/// Mix interleaved multi-channel samples down to mono f32 by averaging.
fn mix_to_mono(frame: &AudioFrame) -> Vec<f32> {
    let channels = frame.channels as usize;
    match &frame.samples {
        Samples::F32(samples) => {
            if channels == 1 {
                samples.clone()
            } else {
                samples
                    .chunks_exact(channels)
                    .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                    .collect()
            }
        }
        Samples::I16(samples) => samples
            .chunks_exact(channels)
            .map(|chunk| {
                let sum: f32 = chunk.iter().map(|&s| s as f32 / i16::MAX as f32).sum();
                sum / channels as f32
            })
            .collect(),
    }
}

/// Linear-interpolation resample from the cached input rate to 16kHz.
///
/// Output capacity is sized `ceil(len / step) + 1` so rounding never
/// truncates the final sample.
fn resample(samples: &[f32], step: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    if step == 1.0 {
        return samples.to_vec();
    }

    let output_len = (samples.len() as f64 / step).ceil() as usize;
    let mut out = Vec::with_capacity(output_len + 1);
    for i in 0..output_len {
        let source_pos = i as f64 * step;
        let source_idx = source_pos.floor() as usize;
        let fraction = source_pos - source_idx as f64;

        let value = if source_idx + 1 >= samples.len() {
            samples[samples.len() - 1]
        } else {
            let left = samples[source_idx] as f64;
            let right = samples[source_idx + 1] as f64;
            (left + (right - left) * fraction) as f32
        };
        out.push(value);
    }
    out
}
