//! fxcore - Effect Chain Processing Engine
//!
//! Applies a configurable chain of audio effects to in-memory buffers.
//! Decoding, encoding and effect discovery belong to the host.
//!
//! # Architecture
//!
//! - `engine`: the [`AudioBuffer`] passed between host and effects
//! - `dsp`: filter, delay, modulation, reverb and dynamics effects plus the
//!   [`EffectChain`] that runs them block by block
//! - `analysis`: whole-buffer features behind the adaptive limiter
//!
//! # Example
//!
//! ```
//! use fxcore::{AudioBuffer, ChainConfig, EffectChain};
//!
//! let config = ChainConfig::from_json(
//!     r#"{"effects": [{"effect": "highpass"}, {"effect": "compressor"}, {"effect": "limiter"}]}"#,
//! )?;
//! let mut chain = EffectChain::from_config(&config, 44100)?;
//! let mut buffer = AudioBuffer::silence(1, 1.0, 44100);
//! chain.process(&mut buffer)?;
//! assert!(buffer.channel(0).iter().all(|&s| s == 0.0));
//! # Ok::<(), fxcore::FxError>(())
//! ```

pub mod analysis;
pub mod dsp;
pub mod engine;
pub mod error;

pub use analysis::{MirFeatureEstimator, MirFeatureSet};
pub use dsp::{ChainConfig, Effect, EffectChain, EffectConfig};
pub use engine::AudioBuffer;
pub use error::{FxError, Result};
