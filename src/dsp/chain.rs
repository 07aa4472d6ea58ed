//! Effect Chain management
//!
//! Effects are processed in chain order (index 0 first), all at the chain's
//! sample rate. Every entry carries a uuid so hosts can edit the chain
//! without tracking indices.

use super::effect::{Effect, EffectConfig};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Serializable description of a chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Effects in processing order
    pub effects: Vec<EffectConfig>,
}

impl ChainConfig {
    pub fn new(effects: Vec<EffectConfig>) -> Self {
        Self { effects }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One effect plus its instance id
#[derive(Debug, Clone)]
struct ChainEntry {
    id: String,
    effect: Effect,
}

impl ChainEntry {
    fn new(effect: Effect) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            effect,
        }
    }
}

/// Chain of effects for processing
#[derive(Debug, Clone)]
pub struct EffectChain {
    entries: Vec<ChainEntry>,
    sample_rate: u32,
}

impl EffectChain {
    /// Create a new empty effect chain
    pub fn new(sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(FxError::invalid_parameter(
                "sample_rate",
                sample_rate,
                "a positive sample rate",
            ));
        }
        Ok(Self {
            entries: Vec::new(),
            sample_rate,
        })
    }

    /// Build every effect in `config`, failing on the first invalid one
    pub fn from_config(config: &ChainConfig, sample_rate: u32) -> Result<Self> {
        let mut chain = Self::new(sample_rate)?;
        for effect in &config.effects {
            chain.push(effect.clone())?;
        }
        Ok(chain)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current configuration, in chain order
    pub fn config(&self) -> ChainConfig {
        ChainConfig::new(self.entries.iter().map(|e| e.effect.config()).collect())
    }

    /// Build and append an effect, returning its id
    pub fn push(&mut self, config: EffectConfig) -> Result<String> {
        self.insert(self.entries.len(), config)
    }

    /// Build and insert an effect at `index` (clamped to the chain length)
    pub fn insert(&mut self, index: usize, config: EffectConfig) -> Result<String> {
        let effect = Effect::new(config, self.sample_rate)?;
        self.insert_effect(index, effect)
    }

    /// Insert an already built effect; it must run at the chain's rate
    pub fn insert_effect(&mut self, index: usize, effect: Effect) -> Result<String> {
        if effect.sample_rate() != self.sample_rate {
            return Err(FxError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: effect.sample_rate(),
            });
        }

        let index = index.min(self.entries.len());
        let entry = ChainEntry::new(effect);
        let id = entry.id.clone();
        tracing::debug!(effect = entry.effect.kind(), %id, index, "effect added to chain");
        self.entries.insert(index, entry);
        Ok(id)
    }

    /// Remove an effect by ID
    pub fn remove(&mut self, effect_id: &str) -> Result<Effect> {
        let index = self.position(effect_id)?;
        let entry = self.entries.remove(index);
        tracing::debug!(effect = entry.effect.kind(), id = effect_id, "effect removed from chain");
        Ok(entry.effect)
    }

    /// Move an effect to a new position
    pub fn move_effect(&mut self, effect_id: &str, new_index: usize) -> Result<()> {
        let current_index = self.position(effect_id)?;
        let entry = self.entries.remove(current_index);
        let new_index = new_index.min(self.entries.len());
        tracing::debug!(id = effect_id, from = current_index, to = new_index, "effect moved");
        self.entries.insert(new_index, entry);
        Ok(())
    }

    /// Get a reference to an effect by ID
    pub fn get(&self, effect_id: &str) -> Option<&Effect> {
        self.entries
            .iter()
            .find(|e| e.id == effect_id)
            .map(|e| &e.effect)
    }

    /// Iterate over `(id, effect)` in chain order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Effect)> {
        self.entries.iter().map(|e| (e.id.as_str(), &e.effect))
    }

    /// Get the number of effects in the chain
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reset all effects
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.effect.reset();
        }
    }

    /// Rebuild every effect for a new sample rate
    ///
    /// Ids are kept and all stream state is dropped. On error the chain is
    /// left unchanged.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(FxError::invalid_parameter(
                "sample_rate",
                sample_rate,
                "a positive sample rate",
            ));
        }

        let rebuilt = self
            .entries
            .iter()
            .map(|entry| {
                Ok(ChainEntry {
                    id: entry.id.clone(),
                    effect: Effect::new(entry.effect.config(), sample_rate)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(from = self.sample_rate, to = sample_rate, "chain sample rate changed");
        self.entries = rebuilt;
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Process one block through every effect in order
    ///
    /// Stops at the first failing effect; the buffer then holds the output
    /// of the effects before it, since a failing effect writes nothing back.
    pub fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        buffer.validate()?;
        if buffer.sample_rate() != self.sample_rate {
            return Err(FxError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: buffer.sample_rate(),
            });
        }

        tracing::trace!(
            effects = self.entries.len(),
            samples = buffer.len(),
            "processing chain block"
        );

        for entry in &mut self.entries {
            entry.effect.process(buffer)?;
        }
        Ok(())
    }

    fn position(&self, effect_id: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == effect_id)
            .ok_or_else(|| FxError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })
    }
}
