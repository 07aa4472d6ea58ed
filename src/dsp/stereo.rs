//! Stereo widening (Haas effect)
//!
//! Mono in, stereo out: channel 0 carries the input unchanged, channel 1
//! the input delayed by 15 ms.

use super::delay_line::DelayLine;
use super::effect::Processor;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};

/// Inter-channel delay in seconds
pub const HAAS_DELAY_SECONDS: f64 = 0.015;

/// Mono-to-stereo Haas widener
#[derive(Debug, Clone)]
pub struct Stereo {
    sample_rate: u32,
    delay_samples: f32,
    line: DelayLine,
}

impl Stereo {
    pub fn new(sample_rate: u32) -> Result<Self> {
        let delay_samples = HAAS_DELAY_SECONDS * sample_rate as f64;
        if delay_samples < 1.0 {
            return Err(FxError::invalid_parameter(
                "sample_rate",
                sample_rate,
                format!(
                    "at least {} Hz for a one-sample Haas delay",
                    (1.0 / HAAS_DELAY_SECONDS).ceil()
                ),
            ));
        }

        Ok(Self {
            sample_rate,
            delay_samples: delay_samples as f32,
            line: DelayLine::from_seconds(HAAS_DELAY_SECONDS, sample_rate)?,
        })
    }

    /// Inter-channel delay in samples
    pub fn delay_samples(&self) -> f32 {
        self.delay_samples
    }
}

impl Processor for Stereo {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        if buffer.num_channels() != 1 {
            return Err(FxError::invalid_parameter(
                "channels",
                buffer.num_channels(),
                "1 (downmix to mono before Stereo)",
            ));
        }

        let delay = self.delay_samples.min(self.line.capacity() as f32);
        let reference = buffer.channel(0).to_vec();
        let mut delayed = Vec::with_capacity(reference.len());
        for &sample in &reference {
            delayed.push(self.line.read(delay)?);
            self.line.write(sample);
        }

        buffer.replace_channels(vec![reference, delayed]);
        Ok(())
    }

    fn reset(&mut self) {
        self.line.clear();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
