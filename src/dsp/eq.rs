//! Filter effects: Highpass, Lowpass, LowShelf, HighShelf
//!
//! Thin wrappers binding validated parameters to a [`BiquadFilter`].

use super::biquad::{BiquadFilter, FilterType, BUTTERWORTH_Q};
use super::effect::Processor;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Default corner frequency for every filter kind
pub const DEFAULT_CUTOFF_HZ: f32 = 50.0;

/// Default shelf Q (1/sqrt(2) as stored in single precision)
pub const DEFAULT_SHELF_Q: f32 = 0.707_106_77;

fn validate_cutoff(cutoff_frequency_hz: f32) -> Result<()> {
    if !cutoff_frequency_hz.is_finite() || cutoff_frequency_hz <= 0.0 {
        return Err(FxError::invalid_parameter(
            "cutoff_frequency_hz",
            cutoff_frequency_hz,
            "greater than 0 Hz and below Nyquist",
        ));
    }
    Ok(())
}

/// Highpass / Lowpass parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Corner frequency in Hz (0 < f < Nyquist)
    pub cutoff_frequency_hz: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            cutoff_frequency_hz: DEFAULT_CUTOFF_HZ,
        }
    }
}

impl FilterParams {
    /// Checks that do not need the sample rate; Nyquist is checked on build
    pub fn validate(&self) -> Result<()> {
        validate_cutoff(self.cutoff_frequency_hz)
    }
}

/// LowShelf / HighShelf parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfParams {
    /// Shelf corner frequency in Hz (0 < f < Nyquist)
    pub cutoff_frequency_hz: f32,
    /// Shelf gain in dB
    pub gain_db: f32,
    /// Shelf slope (Q > 0)
    pub q: f32,
}

impl Default for ShelfParams {
    fn default() -> Self {
        Self {
            cutoff_frequency_hz: DEFAULT_CUTOFF_HZ,
            gain_db: 0.0,
            q: DEFAULT_SHELF_Q,
        }
    }
}

impl ShelfParams {
    pub fn validate(&self) -> Result<()> {
        validate_cutoff(self.cutoff_frequency_hz)?;
        if !self.q.is_finite() || self.q <= 0.0 {
            return Err(FxError::invalid_parameter("q", self.q, "greater than 0"));
        }
        if !self.gain_db.is_finite() {
            return Err(FxError::invalid_parameter("gain_db", self.gain_db, "a finite gain"));
        }
        Ok(())
    }
}

/// Second-order Butterworth highpass or lowpass
#[derive(Debug, Clone)]
pub struct PassFilter {
    params: FilterParams,
    sample_rate: u32,
    filter: BiquadFilter,
}

impl PassFilter {
    pub fn highpass(params: FilterParams, sample_rate: u32) -> Result<Self> {
        Self::build(FilterType::HighPass, params, sample_rate)
    }

    pub fn lowpass(params: FilterParams, sample_rate: u32) -> Result<Self> {
        Self::build(FilterType::LowPass, params, sample_rate)
    }

    fn build(filter_type: FilterType, params: FilterParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;
        let filter = BiquadFilter::new(
            filter_type,
            sample_rate,
            params.cutoff_frequency_hz as f64,
            0.0,
            BUTTERWORTH_Q,
        )?;
        Ok(Self {
            params,
            sample_rate,
            filter,
        })
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn filter(&self) -> &BiquadFilter {
        &self.filter
    }
}

impl Processor for PassFilter {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        self.filter.process(buffer);
        Ok(())
    }

    fn reset(&mut self) {
        self.filter.reset();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Low or high shelving filter
#[derive(Debug, Clone)]
pub struct ShelfFilter {
    params: ShelfParams,
    sample_rate: u32,
    filter: BiquadFilter,
}

impl ShelfFilter {
    pub fn low_shelf(params: ShelfParams, sample_rate: u32) -> Result<Self> {
        Self::build(FilterType::LowShelf, params, sample_rate)
    }

    pub fn high_shelf(params: ShelfParams, sample_rate: u32) -> Result<Self> {
        Self::build(FilterType::HighShelf, params, sample_rate)
    }

    fn build(filter_type: FilterType, params: ShelfParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;
        let filter = BiquadFilter::new(
            filter_type,
            sample_rate,
            params.cutoff_frequency_hz as f64,
            params.gain_db as f64,
            params.q as f64,
        )?;
        Ok(Self {
            params,
            sample_rate,
            filter,
        })
    }

    pub fn params(&self) -> &ShelfParams {
        &self.params
    }

    pub fn filter(&self) -> &BiquadFilter {
        &self.filter
    }
}

impl Processor for ShelfFilter {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        self.filter.process(buffer);
        Ok(())
    }

    fn reset(&mut self) {
        self.filter.reset();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
