//! DSP Effects Library
//!
//! Shared primitives (biquad, delay line, LFO, envelope follower) and the
//! twelve effect kinds built on them. [`Effect`] dispatches over the kinds;
//! [`EffectChain`] runs them in order.

mod biquad;
mod chain;
mod chorus;
mod compressor;
mod delay;
mod delay_line;
mod distortion;
mod effect;
mod envelope;
mod eq;
mod lfo;
mod limiter;
mod phaser;
mod reverb;
mod stereo;

pub use biquad::{BiquadCoeffs, BiquadFilter, FilterType, BUTTERWORTH_Q};
pub use chain::{ChainConfig, EffectChain};
pub use chorus::{Chorus, ChorusParams};
pub use compressor::{Compressor, CompressorParams};
pub use delay::{Delay, DelayParams};
pub use delay_line::DelayLine;
pub use distortion::{Distortion, DistortionParams};
pub use effect::{Effect, EffectConfig, Processor};
pub use envelope::{EnvelopeFollower, GainComputer};
pub use eq::{FilterParams, PassFilter, ShelfFilter, ShelfParams};
pub use lfo::Modulator;
pub use limiter::{HeadroomStrategy, Limiter, LimiterParams, ThresholdStrategy};
pub use phaser::{Phaser, PhaserParams};
pub use reverb::{Reverb, ReverbNetwork, ReverbParams};
pub use stereo::Stereo;
