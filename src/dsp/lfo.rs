//! Low frequency oscillator driving Chorus and Phaser

use crate::error::{FxError, Result};
use std::f64::consts::TAU;

/// Highest modulation rate accepted
pub const MAX_RATE_HZ: f64 = 100.0;

/// Reject rates outside `[0, MAX_RATE_HZ]` (and NaN)
pub(crate) fn check_rate(rate_hz: f64) -> Result<()> {
    if !(0.0..=MAX_RATE_HZ).contains(&rate_hz) {
        return Err(FxError::invalid_parameter(
            "rate_hz",
            rate_hz,
            format!("0 to {} Hz", MAX_RATE_HZ),
        ));
    }
    Ok(())
}

/// Sine LFO producing values in [-1, 1]
///
/// Phase advances by `rate_hz / sample_rate` per sample and wraps into
/// [0, 1). Phase is kept in f64 so long streams do not drift.
#[derive(Debug, Clone)]
pub struct Modulator {
    phase: f64,
    phase_inc: f64,
}

impl Modulator {
    pub fn new(rate_hz: f64, sample_rate: u32) -> Result<Self> {
        check_rate(rate_hz)?;
        if sample_rate == 0 {
            return Err(FxError::invalid_parameter(
                "sample_rate",
                sample_rate,
                "a positive sample rate",
            ));
        }

        Ok(Self {
            phase: 0.0,
            phase_inc: rate_hz / sample_rate as f64,
        })
    }

    /// Current phase in [0, 1)
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Value at the current phase, then advance one sample
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        let value = (TAU * self.phase).sin();
        self.phase += self.phase_inc;
        self.phase -= self.phase.floor();
        value as f32
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
