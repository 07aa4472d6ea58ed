//! Effect definitions
//!
//! The effect set is closed: [`EffectConfig`] names one of twelve kinds with
//! its parameters, and [`Effect`] is the built, stateful unit. Each kind's
//! DSP lives in its own module behind the [`Processor`] trait.

use super::chorus::{Chorus, ChorusParams};
use super::compressor::{Compressor, CompressorParams};
use super::delay::{Delay, DelayParams};
use super::distortion::{Distortion, DistortionParams};
use super::eq::{FilterParams, PassFilter, ShelfFilter, ShelfParams};
use super::limiter::{Limiter, LimiterParams};
use super::phaser::{Phaser, PhaserParams};
use super::reverb::{Reverb, ReverbParams};
use super::stereo::Stereo;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Per-kind processing contract
///
/// Implementors may assume the buffer has already been validated and runs
/// at their sample rate; [`Effect::process`] checks both.
pub trait Processor {
    /// Process one block in place, carrying state over from the previous block
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()>;

    /// Forget all stream state
    fn reset(&mut self);

    /// Sample rate the unit was built for
    fn sample_rate(&self) -> u32;
}

/// Reject values outside `[min, max]` (and NaN)
pub(crate) fn check_range(param: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if !(value >= min && value <= max) {
        return Err(FxError::invalid_parameter(
            param,
            value,
            format!("{} to {}", min, max),
        ));
    }
    Ok(())
}

/// Feedback must stay strictly inside (-1, 1) for the loop to decay
pub(crate) fn check_feedback(feedback: f32) -> Result<()> {
    if !(feedback.abs() < 1.0) {
        return Err(FxError::invalid_parameter(
            "feedback",
            feedback,
            "greater than -1.0 and less than 1.0",
        ));
    }
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

/// Effect kind plus its parameters
///
/// Serialized with an `effect` tag, e.g.
/// `{"effect": "compressor", "threshold_db": -18.0, "ratio": 4.0}`.
/// Omitted fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectConfig {
    Reverb(ReverbParams),
    Distortion(DistortionParams),
    Phaser(PhaserParams),
    Delay(DelayParams),
    Chorus(ChorusParams),
    Compressor(CompressorParams),
    Stereo,
    Limiter(LimiterParams),
    Highpass(FilterParams),
    Lowpass(FilterParams),
    LowShelf(ShelfParams),
    HighShelf(ShelfParams),
}

impl EffectConfig {
    /// Snake-case tag of the kind
    pub fn kind(&self) -> &'static str {
        match self {
            EffectConfig::Reverb(_) => "reverb",
            EffectConfig::Distortion(_) => "distortion",
            EffectConfig::Phaser(_) => "phaser",
            EffectConfig::Delay(_) => "delay",
            EffectConfig::Chorus(_) => "chorus",
            EffectConfig::Compressor(_) => "compressor",
            EffectConfig::Stereo => "stereo",
            EffectConfig::Limiter(_) => "limiter",
            EffectConfig::Highpass(_) => "highpass",
            EffectConfig::Lowpass(_) => "lowpass",
            EffectConfig::LowShelf(_) => "low_shelf",
            EffectConfig::HighShelf(_) => "high_shelf",
        }
    }

    /// Range checks that do not depend on the sample rate
    pub fn validate(&self) -> Result<()> {
        match self {
            EffectConfig::Reverb(p) => p.validate(),
            EffectConfig::Distortion(p) => p.validate(),
            EffectConfig::Phaser(p) => p.validate(),
            EffectConfig::Delay(p) => p.validate(),
            EffectConfig::Chorus(p) => p.validate(),
            EffectConfig::Compressor(p) => p.validate(),
            EffectConfig::Stereo => Ok(()),
            EffectConfig::Limiter(p) => p.validate(),
            EffectConfig::Highpass(p) | EffectConfig::Lowpass(p) => p.validate(),
            EffectConfig::LowShelf(p) | EffectConfig::HighShelf(p) => p.validate(),
        }
    }

    /// Parse a single effect config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Effect
// ============================================================================

/// A built effect bound to one sample rate
///
/// Parameters are fixed for the lifetime of the instance; build a new one
/// to change them.
#[derive(Debug, Clone)]
pub enum Effect {
    Reverb(Reverb),
    Distortion(Distortion),
    Phaser(Phaser),
    Delay(Delay),
    Chorus(Chorus),
    Compressor(Compressor),
    Stereo(Stereo),
    Limiter(Limiter),
    Highpass(PassFilter),
    Lowpass(PassFilter),
    LowShelf(ShelfFilter),
    HighShelf(ShelfFilter),
}

/// Run `$body` against whichever unit `$effect` holds
macro_rules! dispatch {
    ($effect:expr, $unit:ident => $body:expr) => {
        match $effect {
            Effect::Reverb($unit) => $body,
            Effect::Distortion($unit) => $body,
            Effect::Phaser($unit) => $body,
            Effect::Delay($unit) => $body,
            Effect::Chorus($unit) => $body,
            Effect::Compressor($unit) => $body,
            Effect::Stereo($unit) => $body,
            Effect::Limiter($unit) => $body,
            Effect::Highpass($unit) => $body,
            Effect::Lowpass($unit) => $body,
            Effect::LowShelf($unit) => $body,
            Effect::HighShelf($unit) => $body,
        }
    };
}

impl Effect {
    /// Build an effect, validating every parameter against `sample_rate`
    pub fn new(config: EffectConfig, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(FxError::invalid_parameter(
                "sample_rate",
                sample_rate,
                "a positive sample rate",
            ));
        }

        let kind = config.kind();
        let effect = match config {
            EffectConfig::Reverb(p) => Effect::Reverb(Reverb::new(p, sample_rate)?),
            EffectConfig::Distortion(p) => Effect::Distortion(Distortion::new(p, sample_rate)?),
            EffectConfig::Phaser(p) => Effect::Phaser(Phaser::new(p, sample_rate)?),
            EffectConfig::Delay(p) => Effect::Delay(Delay::new(p, sample_rate)?),
            EffectConfig::Chorus(p) => Effect::Chorus(Chorus::new(p, sample_rate)?),
            EffectConfig::Compressor(p) => Effect::Compressor(Compressor::new(p, sample_rate)?),
            EffectConfig::Stereo => Effect::Stereo(Stereo::new(sample_rate)?),
            EffectConfig::Limiter(p) => Effect::Limiter(Limiter::new(p, sample_rate)?),
            EffectConfig::Highpass(p) => Effect::Highpass(PassFilter::highpass(p, sample_rate)?),
            EffectConfig::Lowpass(p) => Effect::Lowpass(PassFilter::lowpass(p, sample_rate)?),
            EffectConfig::LowShelf(p) => Effect::LowShelf(ShelfFilter::low_shelf(p, sample_rate)?),
            EffectConfig::HighShelf(p) => {
                Effect::HighShelf(ShelfFilter::high_shelf(p, sample_rate)?)
            }
        };

        tracing::debug!(effect = kind, sample_rate, "effect built");
        Ok(effect)
    }

    /// Snake-case tag of the kind
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Reverb(_) => "reverb",
            Effect::Distortion(_) => "distortion",
            Effect::Phaser(_) => "phaser",
            Effect::Delay(_) => "delay",
            Effect::Chorus(_) => "chorus",
            Effect::Compressor(_) => "compressor",
            Effect::Stereo(_) => "stereo",
            Effect::Limiter(_) => "limiter",
            Effect::Highpass(_) => "highpass",
            Effect::Lowpass(_) => "lowpass",
            Effect::LowShelf(_) => "low_shelf",
            Effect::HighShelf(_) => "high_shelf",
        }
    }

    /// The parameters this instance was built from
    pub fn config(&self) -> EffectConfig {
        match self {
            Effect::Reverb(e) => EffectConfig::Reverb(e.params().clone()),
            Effect::Distortion(e) => EffectConfig::Distortion(e.params().clone()),
            Effect::Phaser(e) => EffectConfig::Phaser(e.params().clone()),
            Effect::Delay(e) => EffectConfig::Delay(e.params().clone()),
            Effect::Chorus(e) => EffectConfig::Chorus(e.params().clone()),
            Effect::Compressor(e) => EffectConfig::Compressor(e.params().clone()),
            Effect::Stereo(_) => EffectConfig::Stereo,
            Effect::Limiter(e) => EffectConfig::Limiter(e.params().clone()),
            Effect::Highpass(e) => EffectConfig::Highpass(e.params().clone()),
            Effect::Lowpass(e) => EffectConfig::Lowpass(e.params().clone()),
            Effect::LowShelf(e) => EffectConfig::LowShelf(e.params().clone()),
            Effect::HighShelf(e) => EffectConfig::HighShelf(e.params().clone()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        dispatch!(self, unit => unit.sample_rate())
    }

    /// Process one block in place
    ///
    /// The block is rendered into a scratch copy and written back only on
    /// success, so on error `buffer` still holds its input. Stream state has
    /// advanced either way; call [`Effect::reset`] before reusing the effect.
    ///
    /// # Errors
    /// * [`FxError::InvalidBuffer`] if the block breaks the buffer invariants
    /// * [`FxError::SampleRateMismatch`] if the block's rate differs from the effect's
    /// * [`FxError::InvalidParameter`] for input the kind cannot accept (Stereo on non-mono)
    /// * [`FxError::NumericalInstability`] if any output sample is not finite
    pub fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        buffer.validate()?;

        let sample_rate = self.sample_rate();
        if buffer.sample_rate() != sample_rate {
            return Err(FxError::SampleRateMismatch {
                expected: sample_rate,
                actual: buffer.sample_rate(),
            });
        }

        tracing::trace!(
            effect = self.kind(),
            channels = buffer.num_channels(),
            samples = buffer.len(),
            "processing block"
        );

        let mut output = buffer.clone();
        dispatch!(self, unit => unit.process(&mut output))?;

        if let Some((channel, index)) = output.first_non_finite() {
            tracing::warn!(effect = self.kind(), channel, index, "non-finite output");
            return Err(FxError::NumericalInstability {
                effect: self.kind().to_string(),
                channel,
                index,
            });
        }

        *buffer = output;
        Ok(())
    }

    /// Clear filter history, delay lines, envelopes and LFO phase
    pub fn reset(&mut self) {
        dispatch!(self, unit => unit.reset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn all_defaults() -> Vec<EffectConfig> {
        vec![
            EffectConfig::Reverb(ReverbParams::default()),
            EffectConfig::Distortion(DistortionParams::default()),
            EffectConfig::Phaser(PhaserParams::default()),
            EffectConfig::Delay(DelayParams::default()),
            EffectConfig::Chorus(ChorusParams::default()),
            EffectConfig::Compressor(CompressorParams::default()),
            EffectConfig::Stereo,
            EffectConfig::Limiter(LimiterParams::default()),
            EffectConfig::Highpass(FilterParams::default()),
            EffectConfig::Lowpass(FilterParams::default()),
            EffectConfig::LowShelf(ShelfParams::default()),
            EffectConfig::HighShelf(ShelfParams::default()),
        ]
    }

    #[test]
    fn test_every_kind_builds_with_defaults() {
        for config in all_defaults() {
            let effect = Effect::new(config.clone(), 44100).unwrap();
            assert_eq!(effect.kind(), config.kind());
            assert_eq!(effect.config(), config);
            assert_eq!(effect.sample_rate(), 44100);
        }
    }

    #[test]
    fn test_config_json_uses_effect_tag() {
        let config = EffectConfig::from_json(r#"{"effect": "compressor", "ratio": 4.0}"#).unwrap();
        assert_eq!(
            config,
            EffectConfig::Compressor(CompressorParams {
                ratio: 4.0,
                ..CompressorParams::default()
            })
        );

        let stereo = EffectConfig::from_json(r#"{"effect": "stereo"}"#).unwrap();
        assert_eq!(stereo, EffectConfig::Stereo);

        let shelf = EffectConfig::from_json(r#"{"effect": "low_shelf", "gain_db": 3.0}"#).unwrap();
        assert_eq!(shelf.kind(), "low_shelf");
    }

    #[test]
    fn test_config_json_roundtrip_keeps_kind() {
        for config in all_defaults() {
            let json = config.to_json().unwrap();
            assert!(json.contains(&format!("\"effect\":\"{}\"", config.kind())));
            assert_eq!(EffectConfig::from_json(&json).unwrap(), config);
        }
    }

    #[test]
    fn test_unknown_kind_is_serialization_error() {
        let err = EffectConfig::from_json(r#"{"effect": "flanger"}"#).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let err = Effect::new(EffectConfig::Stereo, 0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let mut effect = Effect::new(EffectConfig::Distortion(DistortionParams::default()), 48000)
            .unwrap();
        let mut buffer = AudioBuffer::new(1, 64, 44100);
        let err = effect.process(&mut buffer).unwrap_err();
        assert_eq!(err.error_code(), "SAMPLE_RATE_MISMATCH");
    }

    #[test]
    fn test_invalid_buffer_rejected_before_processing() {
        let mut effect =
            Effect::new(EffectConfig::Lowpass(FilterParams::default()), 44100).unwrap();
        let mut buffer = AudioBuffer::new(1, 8, 44100);
        buffer.channel_mut(0)[3] = f32::NAN;
        let err = effect.process(&mut buffer).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BUFFER");
    }

    #[test]
    fn test_overflow_reported_as_instability() {
        let mut effect = Effect::new(
            EffectConfig::LowShelf(ShelfParams {
                cutoff_frequency_hz: 1000.0,
                gain_db: 24.0,
                ..ShelfParams::default()
            }),
            44100,
        )
        .unwrap();
        let input = AudioBuffer::from_channels(vec![vec![1.0e38; 2000]], 44100).unwrap();
        let mut buffer = input.clone();

        match effect.process(&mut buffer) {
            Err(FxError::NumericalInstability { effect, channel, .. }) => {
                assert_eq!(effect, "low_shelf");
                assert_eq!(channel, 0);
            }
            other => panic!("expected NumericalInstability, got {:?}", other),
        }
        assert_eq!(buffer, input, "failed block must leave the input in place");
    }

    #[test]
    fn test_rejected_block_leaves_buffer_untouched() {
        let mut effect = Effect::new(EffectConfig::Stereo, 44100).unwrap();
        let input = AudioBuffer::from_channels(vec![vec![0.25; 64], vec![-0.25; 64]], 44100)
            .unwrap();
        let mut buffer = input.clone();
        assert!(effect.process(&mut buffer).is_err());
        assert_eq!(buffer, input);
    }

    #[test_case(EffectConfig::Chorus(ChorusParams { rate_hz: -1.0, ..ChorusParams::default() }) ; "chorus negative rate")]
    #[test_case(EffectConfig::Chorus(ChorusParams { rate_hz: 500.0, ..ChorusParams::default() }) ; "chorus rate too high")]
    #[test_case(EffectConfig::Phaser(PhaserParams { rate_hz: -1.0, ..PhaserParams::default() }) ; "phaser negative rate")]
    #[test_case(EffectConfig::Phaser(PhaserParams { rate_hz: f32::NAN, ..PhaserParams::default() }) ; "phaser nan rate")]
    #[test_case(EffectConfig::Compressor(CompressorParams { attack_ms: -5.0, ..CompressorParams::default() }) ; "compressor negative attack")]
    #[test_case(EffectConfig::Compressor(CompressorParams { release_ms: 0.0, ..CompressorParams::default() }) ; "compressor zero release")]
    #[test_case(EffectConfig::Limiter(LimiterParams { release_ms: f32::INFINITY, ..LimiterParams::default() }) ; "limiter infinite release")]
    fn test_validate_agrees_with_build(config: EffectConfig) {
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(Effect::new(config, 44100).is_err());
    }

    #[test]
    fn test_defaults_validate() {
        for config in all_defaults() {
            assert!(config.validate().is_ok(), "{} defaults rejected", config.kind());
        }
    }

    #[test]
    fn test_reset_restores_initial_response() {
        let mut effect = Effect::new(
            EffectConfig::Delay(DelayParams {
                delay_seconds: 0.001,
                feedback: 0.5,
                mix: 0.5,
            }),
            44100,
        )
        .unwrap();
        let input = AudioBuffer::from_channels(
            vec![(0..512).map(|i| ((i as f32) * 0.05).sin()).collect()],
            44100,
        )
        .unwrap();

        let mut first = input.clone();
        effect.process(&mut first).unwrap();
        effect.reset();
        let mut second = input.clone();
        effect.process(&mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_check_feedback_bounds() {
        assert!(check_feedback(0.0).is_ok());
        assert!(check_feedback(-0.99).is_ok());
        assert!(check_feedback(1.0).is_err());
        assert!(check_feedback(f32::NAN).is_err());
    }
}
