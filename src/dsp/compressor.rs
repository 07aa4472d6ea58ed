//! Compressor effect
//!
//! Per-channel envelope follower driving a hard-knee threshold/ratio gain
//! computer. No makeup gain: the compressor only ever attenuates.

use super::effect::{check_range, Processor};
use super::envelope::{check_time_ms, EnvelopeFollower, GainComputer};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Lowest threshold accepted, in dBFS
pub const MIN_THRESHOLD_DB: f32 = -120.0;

/// Compressor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Threshold level in dBFS (-120 to 0)
    pub threshold_db: f32,
    /// Compression ratio (1.0 or greater, 1.0 = no compression)
    pub ratio: f32,
    /// Attack time in milliseconds (> 0)
    pub attack_ms: f32,
    /// Release time in milliseconds (> 0)
    pub release_ms: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack_ms: 1.0,
            release_ms: 100.0,
        }
    }
}

impl CompressorParams {
    pub fn validate(&self) -> Result<()> {
        check_range("threshold_db", self.threshold_db, MIN_THRESHOLD_DB, 0.0)?;
        if !self.ratio.is_finite() || self.ratio < 1.0 {
            return Err(FxError::invalid_parameter(
                "ratio",
                self.ratio,
                "1.0 or greater",
            ));
        }
        check_time_ms("attack_ms", self.attack_ms)?;
        check_time_ms("release_ms", self.release_ms)
    }
}

/// Feed-forward compressor
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    sample_rate: u32,
    computer: GainComputer,
    /// Follower template cloned per channel
    template: EnvelopeFollower,
    envelopes: Vec<EnvelopeFollower>,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;
        let template = EnvelopeFollower::new(params.attack_ms, params.release_ms, sample_rate)?;
        let computer = GainComputer::new(params.threshold_db, params.ratio);

        Ok(Self {
            params,
            sample_rate,
            computer,
            template,
            envelopes: Vec::new(),
        })
    }

    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// Current envelope level per channel (linear), for metering
    pub fn envelope_levels(&self) -> Vec<f32> {
        self.envelopes.iter().map(EnvelopeFollower::level).collect()
    }
}

impl Processor for Compressor {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        while self.envelopes.len() < buffer.num_channels() {
            self.envelopes.push(self.template.clone());
        }

        let computer = self.computer;
        for (channel, envelope) in buffer.channels_mut().zip(self.envelopes.iter_mut()) {
            for sample in channel.iter_mut() {
                let level = envelope.process(*sample);
                *sample *= computer.gain(level);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.envelopes.clear();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
