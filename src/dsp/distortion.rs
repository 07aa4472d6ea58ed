//! Distortion effect
//!
//! Gain boost into a tanh waveshaper, normalised so full scale in maps to
//! full scale out. Stateless apart from the sample rate it was built for.

use super::effect::{check_range, Processor};
use crate::engine::{db_to_linear, AudioBuffer};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Largest drive accepted, in dB
pub const MAX_DRIVE_DB: f32 = 100.0;

/// Distortion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionParams {
    /// Input boost ahead of the waveshaper in dB (0 to 100)
    pub drive_db: f32,
}

impl Default for DistortionParams {
    fn default() -> Self {
        Self { drive_db: 25.0 }
    }
}

impl DistortionParams {
    pub fn validate(&self) -> Result<()> {
        check_range("drive_db", self.drive_db, 0.0, MAX_DRIVE_DB)
    }
}

/// tanh soft clipper
#[derive(Debug, Clone)]
pub struct Distortion {
    params: DistortionParams,
    sample_rate: u32,
    /// Linear drive gain
    drive: f64,
    /// 1 / tanh(drive): output makeup
    makeup: f64,
}

impl Distortion {
    pub fn new(params: DistortionParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;
        let drive = db_to_linear(params.drive_db) as f64;
        Ok(Self {
            params,
            sample_rate,
            drive,
            makeup: 1.0 / drive.tanh(),
        })
    }

    pub fn params(&self) -> &DistortionParams {
        &self.params
    }

    #[inline]
    pub fn process_sample(&self, input: f32) -> f32 {
        ((self.drive * input as f64).tanh() * self.makeup) as f32
    }
}

impl Processor for Distortion {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        for channel in buffer.channels_mut() {
            for sample in channel.iter_mut() {
                *sample = self.process_sample(*sample);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {}

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_drive() {
        assert_eq!(DistortionParams::default().drive_db, 25.0);
    }

    #[test]
    fn test_full_scale_maps_to_full_scale() {
        for drive_db in [0.0, 6.0, 25.0, 60.0] {
            let dist = Distortion::new(DistortionParams { drive_db }, 44100).unwrap();
            assert_relative_eq!(dist.process_sample(1.0), 1.0, epsilon = 1e-5);
            assert_relative_eq!(dist.process_sample(-1.0), -1.0, epsilon = 1e-5);
            assert_eq!(dist.process_sample(0.0), 0.0);
        }
    }

    #[test]
    fn test_output_is_odd_and_monotonic() {
        let dist = Distortion::new(DistortionParams::default(), 44100).unwrap();
        let mut prev = dist.process_sample(-1.0);
        for i in -99..=100 {
            let x = i as f32 / 100.0;
            let y = dist.process_sample(x);
            assert!(y >= prev);
            assert_relative_eq!(y, -dist.process_sample(-x), epsilon = 1e-6);
            prev = y;
        }
    }

    #[test]
    fn test_drive_adds_gain_to_quiet_signal() {
        let dist = Distortion::new(DistortionParams { drive_db: 20.0 }, 44100).unwrap();
        // tanh(10 * 0.01) / tanh(10) ~= 0.0997
        assert!(dist.process_sample(0.01) > 0.09);
    }

    #[test]
    fn test_output_bounded_for_hot_input() {
        let mut dist = Distortion::new(DistortionParams { drive_db: 40.0 }, 44100).unwrap();
        let mut buffer =
            AudioBuffer::from_channels(vec![vec![8.0, -8.0, 3.0, -0.5]], 44100).unwrap();
        dist.process(&mut buffer).unwrap();
        assert!(buffer.channel(0).iter().all(|s| s.abs() <= 1.0 + 1e-6));
    }

    #[test]
    fn test_drive_out_of_range_rejected() {
        assert!(Distortion::new(DistortionParams { drive_db: -1.0 }, 44100).is_err());
        assert!(Distortion::new(DistortionParams { drive_db: 101.0 }, 44100).is_err());
    }
}
