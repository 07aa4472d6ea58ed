//! Second-order IIR filter core
//!
//! Coefficients follow the Audio EQ Cookbook. Backs the Highpass, Lowpass,
//! LowShelf and HighShelf effects.

use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Butterworth Q used by the pass filters unless overridden
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Largest shelf gain accepted, in either direction
pub const MAX_SHELF_GAIN_DB: f64 = 96.0;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Remove above frequency (low-pass filter)
    LowPass,
    /// Remove below frequency (high-pass filter)
    HighPass,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Calculate biquad coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    ///
    /// `gain_db` only affects the shelving types.
    pub fn calculate(
        filter_type: FilterType,
        sample_rate: u32,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Result<Self> {
        let nyquist = sample_rate as f64 / 2.0;
        if sample_rate == 0 {
            return Err(FxError::invalid_parameter(
                "sample_rate",
                sample_rate,
                "a positive sample rate",
            ));
        }
        if !frequency.is_finite() || frequency <= 0.0 || frequency >= nyquist {
            return Err(FxError::invalid_parameter(
                "cutoff_frequency_hz",
                frequency,
                format!("0 < f < {} Hz (Nyquist)", nyquist),
            ));
        }
        if !q.is_finite() || q <= 0.0 {
            return Err(FxError::invalid_parameter("q", q, "greater than 0"));
        }
        if !gain_db.is_finite() || gain_db.abs() > MAX_SHELF_GAIN_DB {
            return Err(FxError::invalid_parameter(
                "gain_db",
                gain_db,
                format!("-{0} to +{0} dB", MAX_SHELF_GAIN_DB),
            ));
        }

        let w0 = 2.0 * PI * frequency / sample_rate as f64;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        // Shelf amplitude
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        Ok(BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        })
    }

    /// Magnitude response at DC (z = 1)
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// Two-sample history for one channel
///
/// Transposed direct form II: two state registers instead of four.
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    s1: f64,
    s2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + self.s1;
        self.s1 = c.b1 * input - c.a1 * output + self.s2;
        self.s2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// Biquad filter with independent history per channel
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    filter_type: FilterType,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl BiquadFilter {
    /// Derive coefficients and create a filter with empty history
    pub fn new(
        filter_type: FilterType,
        sample_rate: u32,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Result<Self> {
        Ok(Self {
            filter_type,
            coeffs: BiquadCoeffs::calculate(filter_type, sample_rate, frequency, gain_db, q)?,
            states: Vec::new(),
        })
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Filter one sample on the given channel, updating that channel's history
    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        if channel >= self.states.len() {
            self.states.resize_with(channel + 1, BiquadState::default);
        }
        self.states[channel].process(input as f64, &self.coeffs) as f32
    }

    /// Filter every channel of the buffer in place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.states.len() < buffer.num_channels() {
            self.states.resize_with(buffer.num_channels(), BiquadState::default);
        }

        for (channel, state) in buffer.channels_mut().zip(self.states.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = state.process(*sample as f64, &self.coeffs) as f32;
            }
        }
    }

    /// Clear filter history on every channel
    pub fn reset(&mut self) {
        self.states.clear();
    }
}
