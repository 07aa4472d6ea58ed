//! Phaser effect
//!
//! Six first-order all-pass stages per channel whose break frequency is
//! swept by a shared sine LFO. The last stage's output is fed back into
//! the first.

use super::effect::{check_feedback, check_range, Processor};
use super::lfo::{check_rate, Modulator};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// All-pass stages per channel
pub const NUM_STAGES: usize = 6;

/// Lowest break frequency the sweep may reach
const MIN_BREAK_HZ: f64 = 20.0;

/// Phaser parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaserParams {
    /// LFO rate in Hz
    pub rate_hz: f32,
    /// Sweep depth relative to the centre frequency (0 to 1)
    pub depth: f32,
    /// Centre break frequency in Hz
    pub centre_frequency_hz: f32,
    /// Feedback from the last stage into the first (|feedback| < 1)
    pub feedback: f32,
    /// Dry/wet mix (0.0 = dry, 1.0 = wet)
    pub mix: f32,
}

impl Default for PhaserParams {
    fn default() -> Self {
        Self {
            rate_hz: 1.0,
            depth: 0.5,
            centre_frequency_hz: 1300.0,
            feedback: 0.0,
            mix: 0.5,
        }
    }
}

impl PhaserParams {
    pub fn validate(&self) -> Result<()> {
        check_rate(self.rate_hz as f64)?;
        check_range("depth", self.depth, 0.0, 1.0)?;
        if !self.centre_frequency_hz.is_finite() || self.centre_frequency_hz <= 0.0 {
            return Err(FxError::invalid_parameter(
                "centre_frequency_hz",
                self.centre_frequency_hz,
                "greater than 0 Hz",
            ));
        }
        check_feedback(self.feedback)?;
        check_range("mix", self.mix, 0.0, 1.0)
    }
}

/// y[n] = a * x[n] + x[n-1] - a * y[n-1]
#[derive(Debug, Clone, Copy, Default)]
struct AllpassStage {
    x1: f32,
    y1: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, input: f32, a: f32) -> f32 {
        let output = a * input + self.x1 - a * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }
}

/// Stage cascade and feedback memory for one channel
#[derive(Debug, Clone, Default)]
struct PhaserChannel {
    stages: [AllpassStage; NUM_STAGES],
    last_output: f32,
}

/// Swept all-pass phaser
#[derive(Debug, Clone)]
pub struct Phaser {
    params: PhaserParams,
    sample_rate: u32,
    lfo: Modulator,
    channels: Vec<PhaserChannel>,
}

impl Phaser {
    pub fn new(params: PhaserParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;

        let nyquist = sample_rate as f64 / 2.0;
        let highest = params.centre_frequency_hz as f64 * (1.0 + params.depth as f64);
        if highest >= nyquist {
            return Err(FxError::invalid_parameter(
                "centre_frequency_hz",
                params.centre_frequency_hz,
                format!(
                    "a sweep peak (centre * (1 + depth)) below Nyquist ({} Hz)",
                    nyquist
                ),
            ));
        }

        let lfo = Modulator::new(params.rate_hz as f64, sample_rate)?;

        Ok(Self {
            params,
            sample_rate,
            lfo,
            channels: Vec::new(),
        })
    }

    pub fn params(&self) -> &PhaserParams {
        &self.params
    }

    /// All-pass coefficient for an LFO value in [-1, 1]
    #[inline]
    fn coefficient(&self, lfo: f32) -> f32 {
        let centre = self.params.centre_frequency_hz as f64;
        let break_hz = (centre * (1.0 + self.params.depth as f64 * lfo as f64)).max(MIN_BREAK_HZ);
        let t = (PI * break_hz / self.sample_rate as f64).tan();
        ((t - 1.0) / (t + 1.0)) as f32
    }
}

impl Processor for Phaser {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        let num_channels = buffer.num_channels();
        if self.channels.len() < num_channels {
            self.channels.resize_with(num_channels, PhaserChannel::default);
        }

        let PhaserParams { feedback, mix, .. } = self.params;

        for i in 0..buffer.len() {
            let lfo = self.lfo.next_value();
            let a = self.coefficient(lfo);

            for (ch, state) in self.channels.iter_mut().take(num_channels).enumerate() {
                let sample = &mut buffer.channel_mut(ch)[i];
                let dry = *sample;

                let mut wet = dry + feedback * state.last_output;
                for stage in state.stages.iter_mut() {
                    wet = stage.process(wet, a);
                }
                state.last_output = wet;

                *sample = dry * (1.0 - mix) + mix * wet;
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.lfo.reset();
        self.channels.clear();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
