//! Limiter Effect
//!
//! Brickwall limiter with an optional adaptive threshold. When no threshold
//! is configured, each call first analyzes the whole input buffer, derives a
//! threshold from its features through a [`ThresholdStrategy`], and only then
//! processes samples.

use super::compressor::MIN_THRESHOLD_DB;
use super::effect::{check_range, Processor};
use super::envelope::{EnvelopeFollower, GainComputer};
use crate::analysis::{MirFeatureEstimator, MirFeatureSet};
use crate::engine::{db_to_linear, AudioBuffer};
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Constants
// ============================================================================

/// Very fast attack time for brickwall limiting (0.1ms)
const ATTACK_MS: f32 = 0.1;

// ============================================================================
// Threshold Strategy
// ============================================================================

/// Maps measured features to a limiter threshold in dBFS
pub trait ThresholdStrategy: fmt::Debug + Send + Sync {
    fn threshold_db(&self, features: &MirFeatureSet) -> f32;
}

/// Peak level minus a headroom that grows with dynamic range
///
/// `threshold = peak_db - min(base + per_db * dynamic_range_db, max)`,
/// never above 0 dBFS. Silence maps to 0 dBFS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadroomStrategy {
    /// Headroom for a signal with no measured dynamic range
    pub base_headroom_db: f32,
    /// Extra headroom per dB of dynamic range
    pub headroom_per_db: f32,
    /// Upper bound on the headroom
    pub max_headroom_db: f32,
}

impl Default for HeadroomStrategy {
    fn default() -> Self {
        Self {
            base_headroom_db: 0.1,
            headroom_per_db: 0.1,
            max_headroom_db: 6.0,
        }
    }
}

impl ThresholdStrategy for HeadroomStrategy {
    fn threshold_db(&self, features: &MirFeatureSet) -> f32 {
        if features.is_silent() {
            return 0.0;
        }
        let headroom = (self.base_headroom_db + self.headroom_per_db * features.dynamic_range_db)
            .min(self.max_headroom_db);
        (features.peak_db - headroom).min(0.0)
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Limiter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterParams {
    /// Release time in milliseconds (> 0)
    pub release_ms: f32,
    /// Fixed threshold in dBFS (-120 to 0); derived from the input when absent
    pub threshold_db: Option<f32>,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            release_ms: 100.0,
            threshold_db: None,
        }
    }
}

impl LimiterParams {
    pub fn validate(&self) -> Result<()> {
        if !self.release_ms.is_finite() || self.release_ms <= 0.0 {
            return Err(FxError::invalid_parameter(
                "release_ms",
                self.release_ms,
                "greater than 0 ms",
            ));
        }
        if let Some(threshold_db) = self.threshold_db {
            check_range("threshold_db", threshold_db, MIN_THRESHOLD_DB, 0.0)?;
        }
        Ok(())
    }
}

// ============================================================================
// Limiter Effect
// ============================================================================

/// Brickwall limiter
///
/// Infinite-ratio gain computer behind a 0.1 ms attack envelope, followed by
/// a ceiling guard for whatever the attack smoothing lets through.
#[derive(Clone)]
pub struct Limiter {
    params: LimiterParams,
    sample_rate: u32,
    estimator: MirFeatureEstimator,
    strategy: Arc<dyn ThresholdStrategy>,
    template: EnvelopeFollower,
    envelopes: Vec<EnvelopeFollower>,
    /// Threshold used by the most recent call
    last_threshold_db: Option<f32>,
}

impl fmt::Debug for Limiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limiter")
            .field("params", &self.params)
            .field("sample_rate", &self.sample_rate)
            .field("strategy", &self.strategy)
            .field("last_threshold_db", &self.last_threshold_db)
            .finish()
    }
}

impl Limiter {
    /// Create a limiter using [`HeadroomStrategy`] for adaptive thresholds
    pub fn new(params: LimiterParams, sample_rate: u32) -> Result<Self> {
        Self::with_strategy(params, sample_rate, HeadroomStrategy::default())
    }

    /// Create a limiter with a custom threshold strategy
    pub fn with_strategy(
        params: LimiterParams,
        sample_rate: u32,
        strategy: impl ThresholdStrategy + 'static,
    ) -> Result<Self> {
        params.validate()?;
        let template = EnvelopeFollower::new(ATTACK_MS, params.release_ms, sample_rate)?;

        Ok(Self {
            params,
            sample_rate,
            estimator: MirFeatureEstimator::new(),
            strategy: Arc::new(strategy),
            template,
            envelopes: Vec::new(),
            last_threshold_db: None,
        })
    }

    pub fn params(&self) -> &LimiterParams {
        &self.params
    }

    /// Threshold applied by the most recent `process` call
    pub fn last_threshold_db(&self) -> Option<f32> {
        self.last_threshold_db
    }

    /// Configured threshold, or one derived from `buffer`'s features
    pub fn resolve_threshold(&self, buffer: &AudioBuffer) -> f32 {
        if let Some(threshold_db) = self.params.threshold_db {
            return threshold_db;
        }

        let features = self.estimator.analyze(buffer);
        let threshold_db = self.strategy.threshold_db(&features).min(0.0);
        tracing::info!(
            peak_db = features.peak_db,
            loudness_db = features.loudness_db,
            dynamic_range_db = features.dynamic_range_db,
            threshold_db,
            "derived limiter threshold"
        );
        threshold_db
    }
}

impl Processor for Limiter {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        let threshold_db = self.resolve_threshold(buffer);
        self.last_threshold_db = Some(threshold_db);

        while self.envelopes.len() < buffer.num_channels() {
            self.envelopes.push(self.template.clone());
        }

        let computer = GainComputer::brickwall(threshold_db);
        let ceiling = db_to_linear(threshold_db);

        for (channel, envelope) in buffer.channels_mut().zip(self.envelopes.iter_mut()) {
            for sample in channel.iter_mut() {
                let level = envelope.process(*sample);
                *sample = (*sample * computer.gain(level)).clamp(-ceiling, ceiling);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.envelopes.clear();
        self.last_threshold_db = None;
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// ============================================================================
// Tests
// ============================================================================
