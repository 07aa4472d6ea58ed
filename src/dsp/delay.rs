//! Delay Effect
//!
//! One feedback delay line per channel.

use super::delay_line::DelayLine;
use super::effect::{check_feedback, check_range, Processor};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Longest delay accepted, in seconds
pub const MAX_DELAY_SECONDS: f32 = 30.0;

/// Delay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayParams {
    /// Delay time in seconds (at least one sample, at most 30 s)
    pub delay_seconds: f32,
    /// Portion of the delayed signal fed back into the line (|feedback| < 1)
    pub feedback: f32,
    /// Dry/wet mix (0.0 = dry, 1.0 = wet)
    pub mix: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            delay_seconds: 0.5,
            feedback: 0.0,
            mix: 0.5,
        }
    }
}

impl DelayParams {
    pub fn validate(&self) -> Result<()> {
        if !self.delay_seconds.is_finite()
            || self.delay_seconds <= 0.0
            || self.delay_seconds > MAX_DELAY_SECONDS
        {
            return Err(FxError::invalid_parameter(
                "delay_seconds",
                self.delay_seconds,
                format!("greater than 0 and at most {} s", MAX_DELAY_SECONDS),
            ));
        }
        check_feedback(self.feedback)?;
        check_range("mix", self.mix, 0.0, 1.0)
    }
}

/// Feedback delay
///
/// `out = dry * (1 - mix) + mix * delayed`, and `dry + delayed * feedback`
/// is written back into the line.
#[derive(Debug, Clone)]
pub struct Delay {
    params: DelayParams,
    sample_rate: u32,
    /// Delay time in (possibly fractional) samples
    delay_samples: f32,
    /// Line template cloned for each new channel
    template: DelayLine,
    lines: Vec<DelayLine>,
}

impl Delay {
    pub fn new(params: DelayParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;

        let delay_samples = params.delay_seconds as f64 * sample_rate as f64;
        if delay_samples < 1.0 {
            return Err(FxError::invalid_parameter(
                "delay_seconds",
                params.delay_seconds,
                format!("at least one sample ({} s)", 1.0 / sample_rate as f64),
            ));
        }

        let template = DelayLine::from_seconds(params.delay_seconds as f64, sample_rate)?;
        tracing::debug!(
            delay_samples,
            capacity = template.capacity(),
            "delay line allocated"
        );

        Ok(Self {
            params,
            sample_rate,
            delay_samples: delay_samples as f32,
            template,
            lines: Vec::new(),
        })
    }

    pub fn params(&self) -> &DelayParams {
        &self.params
    }
}

impl Processor for Delay {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        while self.lines.len() < buffer.num_channels() {
            self.lines.push(self.template.clone());
        }

        let DelayParams { feedback, mix, .. } = self.params;
        let delay = self.delay_samples.min(self.template.capacity() as f32);

        for (channel, line) in buffer.channels_mut().zip(self.lines.iter_mut()) {
            for sample in channel.iter_mut() {
                let dry = *sample;
                let delayed = line.read(delay)?;
                line.write(dry + delayed * feedback);
                *sample = dry * (1.0 - mix) + mix * delayed;
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.lines.clear();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn impulse(len: usize, sample_rate: u32) -> AudioBuffer {
        let mut samples = vec![0.0; len];
        samples[0] = 1.0;
        AudioBuffer::from_channels(vec![samples], sample_rate).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = DelayParams::default();
        assert_eq!(params.delay_seconds, 0.5);
        assert_eq!(params.feedback, 0.0);
        assert_eq!(params.mix, 0.5);
    }

    #[test]
    fn test_impulse_appears_after_delay() {
        let mut delay = Delay::new(
            DelayParams {
                delay_seconds: 0.01,
                feedback: 0.0,
                mix: 1.0,
            },
            1000,
        )
        .unwrap();

        let mut buffer = impulse(30, 1000);
        delay.process(&mut buffer).unwrap();

        let out = buffer.channel(0);
        assert_eq!(out[10], 1.0);
        assert!(out.iter().enumerate().all(|(i, &s)| i == 10 || s == 0.0));
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut delay = Delay::new(
            DelayParams {
                delay_seconds: 0.01,
                feedback: 0.5,
                mix: 1.0,
            },
            1000,
        )
        .unwrap();

        let mut buffer = impulse(40, 1000);
        delay.process(&mut buffer).unwrap();

        let out = buffer.channel(0);
        assert_eq!(out[10], 1.0);
        assert_eq!(out[20], 0.5);
        assert_eq!(out[30], 0.25);
    }

    #[test]
    fn test_zero_mix_is_passthrough() {
        let mut delay = Delay::new(
            DelayParams {
                mix: 0.0,
                feedback: 0.7,
                ..DelayParams::default()
            },
            44100,
        )
        .unwrap();
        let original = AudioBuffer::from_channels(
            vec![(0..2000).map(|i| ((i as f32) * 0.01).sin()).collect()],
            44100,
        )
        .unwrap();
        let mut buffer = original.clone();
        delay.process(&mut buffer).unwrap();
        assert_eq!(buffer, original);
    }

    #[test_case(1.0 ; "unity feedback")]
    #[test_case(1.5 ; "runaway feedback")]
    #[test_case(-1.0 ; "negative unity feedback")]
    fn test_feedback_rejected(feedback: f32) {
        let params = DelayParams {
            feedback,
            ..DelayParams::default()
        };
        let err = Delay::new(params, 44100).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_sub_sample_delay_rejected() {
        let params = DelayParams {
            delay_seconds: 1e-6,
            ..DelayParams::default()
        };
        assert!(Delay::new(params, 44100).is_err());
    }

    #[test]
    fn test_state_carries_across_blocks() {
        let params = DelayParams {
            delay_seconds: 0.01,
            feedback: 0.3,
            mix: 0.6,
        };
        let input = AudioBuffer::from_channels(
            vec![(0..100).map(|i| ((i as f32) * 0.37).sin()).collect()],
            1000,
        )
        .unwrap();

        let mut whole = input.clone();
        Delay::new(params.clone(), 1000)
            .unwrap()
            .process(&mut whole)
            .unwrap();

        let mut delay = Delay::new(params, 1000).unwrap();
        let mut streamed = input.slice(0, 37);
        delay.process(&mut streamed).unwrap();
        let mut tail = input.slice(37, 100);
        delay.process(&mut tail).unwrap();
        streamed.append(&tail).unwrap();

        assert_eq!(streamed, whole);
    }
}
