//! Envelope follower and gain computer shared by Compressor and Limiter

use crate::engine::buffer::{db_to_linear, linear_to_db};
use crate::error::{FxError, Result};

/// Calculate envelope coefficient from time constant
#[inline]
fn time_to_coeff(time_ms: f32, sample_rate: u32) -> f32 {
    (-1.0 / (time_ms * sample_rate as f32 / 1000.0)).exp()
}

/// Attack and release times must be positive and finite
pub(crate) fn check_time_ms(param: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FxError::invalid_parameter(param, value, "greater than 0 ms"));
    }
    Ok(())
}

/// Attack/release smoothed level estimator
///
/// The level moves toward the instantaneous magnitude with one-pole
/// smoothing, using the attack coefficient when rising and the release
/// coefficient when falling.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    /// Current envelope level (linear)
    level: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: u32) -> Result<Self> {
        check_time_ms("attack_ms", attack_ms)?;
        check_time_ms("release_ms", release_ms)?;

        Ok(Self {
            level: 0.0,
            attack_coeff: time_to_coeff(attack_ms, sample_rate),
            release_coeff: time_to_coeff(release_ms, sample_rate),
        })
    }

    /// Feed one sample and return the updated level (linear)
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();
        let coeff = if magnitude > self.level {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.level = coeff * self.level + (1.0 - coeff) * magnitude;
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

/// Static threshold/ratio curve
///
/// Gain reduction is `(level_db - threshold_db) * (1 - 1/ratio)` above the
/// threshold and zero below it.
#[derive(Debug, Clone, Copy)]
pub struct GainComputer {
    threshold_db: f32,
    slope: f32,
}

impl GainComputer {
    pub fn new(threshold_db: f32, ratio: f32) -> Self {
        Self {
            threshold_db,
            slope: 1.0 - 1.0 / ratio,
        }
    }

    /// Infinite ratio: everything above the threshold is pulled down to it
    pub fn brickwall(threshold_db: f32) -> Self {
        Self {
            threshold_db,
            slope: 1.0,
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Gain reduction in dB (>= 0) for a linear level
    #[inline]
    pub fn gain_reduction_db(&self, level: f32) -> f32 {
        let level_db = linear_to_db(level);
        if level_db > self.threshold_db {
            (level_db - self.threshold_db) * self.slope
        } else {
            0.0
        }
    }

    /// Linear gain to multiply into the sample
    #[inline]
    pub fn gain(&self, level: f32) -> f32 {
        db_to_linear(-self.gain_reduction_db(level))
    }
}
