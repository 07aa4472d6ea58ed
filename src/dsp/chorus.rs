//! Chorus effect
//!
//! A sine LFO sweeps the read offset of one delay line per channel around
//! a centre delay. All channels share the LFO so the image stays centred.

use super::delay_line::DelayLine;
use super::effect::{check_feedback, check_range, Processor};
use super::lfo::{check_rate, Modulator};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Delay swing at full depth, in milliseconds either side of the centre
pub const MAX_SWING_MS: f32 = 20.0;

/// Shortest delay the sweep may reach
const MIN_DELAY_MS: f32 = 1.0;

/// Longest centre delay accepted
pub const MAX_CENTRE_DELAY_MS: f32 = 100.0;

/// Chorus parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChorusParams {
    /// LFO rate in Hz
    pub rate_hz: f32,
    /// Sweep depth: 0 (static) to 1 (±20 ms)
    pub depth: f32,
    /// Centre of the sweep in milliseconds
    pub centre_delay_ms: f32,
    /// Recirculation of the delayed signal (|feedback| < 1)
    pub feedback: f32,
    /// Dry/wet mix (0.0 = dry, 1.0 = wet)
    pub mix: f32,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            rate_hz: 1.0,
            depth: 0.25,
            centre_delay_ms: 7.0,
            feedback: 0.0,
            mix: 0.5,
        }
    }
}

impl ChorusParams {
    pub fn validate(&self) -> Result<()> {
        check_rate(self.rate_hz as f64)?;
        check_range("depth", self.depth, 0.0, 1.0)?;
        if !(self.centre_delay_ms > 0.0 && self.centre_delay_ms <= MAX_CENTRE_DELAY_MS) {
            return Err(FxError::invalid_parameter(
                "centre_delay_ms",
                self.centre_delay_ms,
                format!("greater than 0 and at most {} ms", MAX_CENTRE_DELAY_MS),
            ));
        }
        check_feedback(self.feedback)?;
        check_range("mix", self.mix, 0.0, 1.0)
    }

    /// Delay in milliseconds for an LFO value in [-1, 1]
    #[inline]
    fn delay_ms(&self, lfo: f32) -> f32 {
        (self.centre_delay_ms + MAX_SWING_MS * self.depth * lfo).max(MIN_DELAY_MS)
    }
}

/// Modulated delay chorus
#[derive(Debug, Clone)]
pub struct Chorus {
    params: ChorusParams,
    sample_rate: u32,
    lfo: Modulator,
    template: DelayLine,
    lines: Vec<DelayLine>,
}

impl Chorus {
    pub fn new(params: ChorusParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;
        let lfo = Modulator::new(params.rate_hz as f64, sample_rate)?;

        let longest_ms = params.delay_ms(1.0) as f64;
        let capacity = (longest_ms * sample_rate as f64 / 1000.0).ceil() as usize + 1;
        let template = DelayLine::new(capacity)?;

        Ok(Self {
            params,
            sample_rate,
            lfo,
            template,
            lines: Vec::new(),
        })
    }

    pub fn params(&self) -> &ChorusParams {
        &self.params
    }
}

impl Processor for Chorus {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        let num_channels = buffer.num_channels();
        while self.lines.len() < num_channels {
            self.lines.push(self.template.clone());
        }

        let ChorusParams { feedback, mix, .. } = self.params;
        let samples_per_ms = self.sample_rate as f32 / 1000.0;
        let capacity = self.template.capacity() as f32;

        for i in 0..buffer.len() {
            let lfo = self.lfo.next_value();
            let delay = (self.params.delay_ms(lfo) * samples_per_ms).clamp(1.0, capacity);

            for (ch, line) in self.lines.iter_mut().take(num_channels).enumerate() {
                let sample = &mut buffer.channel_mut(ch)[i];
                let dry = *sample;
                let delayed = line.read(delay)?;
                line.write(dry + feedback * delayed);
                *sample = dry * (1.0 - mix) + mix * delayed;
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.lfo.reset();
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

    fn sine(len: usize, sample_rate: u32) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioBuffer::from_channels(vec![samples], sample_rate).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = ChorusParams::default();
        assert_eq!(params.rate_hz, 1.0);
        assert_eq!(params.depth, 0.25);
        assert_eq!(params.centre_delay_ms, 7.0);
        assert_eq!(params.feedback, 0.0);
        assert_eq!(params.mix, 0.5);
    }

    #[test]
    fn test_sweep_floor() {
        let params = ChorusParams {
            centre_delay_ms: 5.0,
            depth: 1.0,
            ..ChorusParams::default()
        };
        assert_eq!(params.delay_ms(-1.0), 1.0);
        assert_eq!(params.delay_ms(1.0), 25.0);
    }

    #[test]
    fn test_zero_mix_is_passthrough() {
        let mut chorus = Chorus::new(
            ChorusParams {
                mix: 0.0,
                feedback: 0.5,
                ..ChorusParams::default()
            },
            44100,
        )
        .unwrap();
        let original = sine(4096, 44100);
        let mut buffer = original.clone();
        chorus.process(&mut buffer).unwrap();
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_static_depth_is_plain_delay() {
        // depth 0 pins the read at the centre: 10 ms at 1 kHz is 10 samples
        let mut chorus = Chorus::new(
            ChorusParams {
                depth: 0.0,
                centre_delay_ms: 10.0,
                mix: 1.0,
                ..ChorusParams::default()
            },
            1000,
        )
        .unwrap();
        let mut samples = vec![0.0; 32];
        samples[0] = 1.0;
        let mut buffer = AudioBuffer::from_channels(vec![samples], 1000).unwrap();
        chorus.process(&mut buffer).unwrap();
        assert_eq!(buffer.channel(0)[10], 1.0);
        assert_eq!(buffer.channel(0)[9], 0.0);
    }

    #[test]
    fn test_output_stays_bounded_with_feedback() {
        let mut chorus = Chorus::new(
            ChorusParams {
                feedback: 0.9,
                depth: 1.0,
                mix: 1.0,
                ..ChorusParams::default()
            },
            44100,
        )
        .unwrap();
        for _ in 0..20 {
            let mut buffer = sine(4410, 44100);
            chorus.process(&mut buffer).unwrap();
            let peak = buffer.channel(0).iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak < 20.0, "Chorus output grew to {}", peak);
        }
    }

    #[test_case(ChorusParams { feedback: 1.0, ..ChorusParams::default() } ; "unity feedback")]
    #[test_case(ChorusParams { depth: 1.5, ..ChorusParams::default() } ; "depth above one")]
    #[test_case(ChorusParams { rate_hz: -1.0, ..ChorusParams::default() } ; "negative rate")]
    #[test_case(ChorusParams { centre_delay_ms: 0.0, ..ChorusParams::default() } ; "zero centre")]
    fn test_invalid_params_rejected(params: ChorusParams) {
        assert!(Chorus::new(params, 44100).is_err());
    }
}
