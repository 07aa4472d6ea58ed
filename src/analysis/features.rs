//! MIR feature extraction
//!
//! Whole-buffer loudness and dynamics descriptors. The limiter computes
//! these once per call, before touching any sample.

use crate::engine::{calculate_peak, calculate_rms, AudioBuffer};
use serde::{Deserialize, Serialize};

/// Loudness block length in seconds
pub const BLOCK_SECONDS: f64 = 0.4;

/// Hop between loudness blocks in seconds
pub const HOP_SECONDS: f64 = 0.1;

/// Blocks quieter than this are ignored (dBFS)
pub const GATE_DB: f64 = -70.0;

/// Read-only summary of one buffer
///
/// Levels are in dBFS; `f32::NEG_INFINITY` stands for "no signal".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirFeatureSet {
    /// Largest absolute sample
    pub peak_db: f32,
    /// RMS over all channels and samples
    pub rms_db: f32,
    /// `peak_db - rms_db`, 0 for silence
    pub crest_factor_db: f32,
    /// Gated power mean of the loudness blocks
    pub loudness_db: f32,
    /// 95th minus 10th percentile of gated block levels
    pub dynamic_range_db: f32,
}

impl MirFeatureSet {
    /// True when the buffer held no non-zero sample
    pub fn is_silent(&self) -> bool {
        !self.peak_db.is_finite()
    }
}

/// Block-based feature estimator
#[derive(Debug, Clone)]
pub struct MirFeatureEstimator {
    block_seconds: f64,
    hop_seconds: f64,
    gate_db: f64,
}

impl Default for MirFeatureEstimator {
    fn default() -> Self {
        Self {
            block_seconds: BLOCK_SECONDS,
            hop_seconds: HOP_SECONDS,
            gate_db: GATE_DB,
        }
    }
}

impl MirFeatureEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze the whole buffer
    pub fn analyze(&self, buffer: &AudioBuffer) -> MirFeatureSet {
        let peak_db = calculate_peak(buffer);
        let rms_db = calculate_rms(buffer);
        let crest_factor_db = if peak_db.is_finite() && rms_db.is_finite() {
            peak_db - rms_db
        } else {
            0.0
        };

        let gated: Vec<f64> = self
            .block_powers(buffer)
            .into_iter()
            .filter(|&power| power > 0.0 && 10.0 * power.log10() > self.gate_db)
            .collect();

        let loudness_db = if gated.is_empty() {
            f32::NEG_INFINITY
        } else {
            let mean = gated.iter().sum::<f64>() / gated.len() as f64;
            (10.0 * mean.log10()) as f32
        };

        let dynamic_range_db = if gated.len() < 2 {
            0.0
        } else {
            let mut levels: Vec<f64> = gated.iter().map(|p| 10.0 * p.log10()).collect();
            levels.sort_by(|a, b| a.total_cmp(b));
            (percentile(&levels, 0.95) - percentile(&levels, 0.10)) as f32
        };

        MirFeatureSet {
            peak_db,
            rms_db,
            crest_factor_db,
            loudness_db,
            dynamic_range_db,
        }
    }

    /// Mean-square power of each block across all channels
    ///
    /// A buffer shorter than one block is measured as a single block.
    fn block_powers(&self, buffer: &AudioBuffer) -> Vec<f64> {
        let len = buffer.len();
        if len == 0 {
            return Vec::new();
        }

        let rate = buffer.sample_rate() as f64;
        let block = ((self.block_seconds * rate) as usize).clamp(1, len);
        let hop = ((self.hop_seconds * rate) as usize).max(1);
        let channels = buffer.channels();

        (0..=len - block)
            .step_by(hop)
            .map(|start| {
                let sum: f64 = channels
                    .iter()
                    .flat_map(|ch| ch[start..start + block].iter())
                    .map(|&s| (s as f64) * (s as f64))
                    .sum();
                sum / (block * channels.len()) as f64
            })
            .collect()
    }
}

/// Linear-interpolated percentile of sorted, non-empty values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}
