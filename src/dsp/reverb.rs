//! Reverb effect
//!
//! Implements the Freeverb algorithm:
//! - 8 parallel damped comb lines for the late tail
//! - 4 series allpass lines for diffusion
//! - a second network offset by a fixed stereo spread, blended by width
//! - freeze mode that holds the current tail indefinitely

use super::delay_line::DelayLine;
use super::effect::{check_range, Processor};
use crate::engine::AudioBuffer;
use crate::error::Result;
use serde::{Deserialize, Serialize};

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Reference sample rate for Freeverb delays
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb line delays at 44100 Hz (8 lines)
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass line delays at 44100 Hz (4 lines)
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Stereo spread offset in samples (for the second network)
const STEREO_SPREAD: usize = 23;

/// Fixed gain for allpass lines (standard Freeverb value)
const ALLPASS_GAIN: f32 = 0.5;

/// Scale factor for room size parameter to feedback
const ROOM_SCALE: f32 = 0.28;

/// Offset for room size parameter to feedback
const ROOM_OFFSET: f32 = 0.7;

/// Scale factor for damping parameter
const DAMP_SCALE: f32 = 0.4;

/// Input attenuation ahead of the comb bank
const FIXED_GAIN: f32 = 0.015;

/// Makeup gain on the wet output
const WET_SCALE: f32 = 3.0;

// ============================================================================
// Parameter Structs
// ============================================================================

/// Reverb effect parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    /// Wet signal level: 0 to 1
    pub wet_level: f32,
    /// Dry signal level: 0 to 1
    pub dry_level: f32,
    /// Room size: 0 (tiny) to 1 (huge hall)
    pub room_size: f32,
    /// Damping: 0 (bright) to 1 (dark)
    pub damping: f32,
    /// Stereo width: 0 (mono) to 1 (full stereo)
    pub width: f32,
    /// Freeze amount: 0 (normal) to 1 (infinite sustain)
    pub freeze_mode: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            wet_level: 0.2,
            dry_level: 0.8,
            room_size: 0.1,
            damping: 0.7,
            width: 1.0,
            freeze_mode: 0.0,
        }
    }
}

impl ReverbParams {
    /// Validate all parameters are within 0.0 to 1.0
    pub fn validate(&self) -> Result<()> {
        check_range("wet_level", self.wet_level, 0.0, 1.0)?;
        check_range("dry_level", self.dry_level, 0.0, 1.0)?;
        check_range("room_size", self.room_size, 0.0, 1.0)?;
        check_range("damping", self.damping, 0.0, 1.0)?;
        check_range("width", self.width, 0.0, 1.0)?;
        check_range("freeze_mode", self.freeze_mode, 0.0, 1.0)
    }

    /// Comb feedback, moved toward 1 by freeze
    fn feedback(&self) -> f32 {
        let normal = self.room_size * ROOM_SCALE + ROOM_OFFSET;
        normal * (1.0 - self.freeze_mode) + self.freeze_mode
    }

    /// Damping amount, moved toward 0 by freeze
    fn damp(&self) -> f32 {
        self.damping * DAMP_SCALE * (1.0 - self.freeze_mode)
    }

    /// Input gain, moved toward 0 by freeze
    fn input_gain(&self) -> f32 {
        FIXED_GAIN * (1.0 - self.freeze_mode)
    }
}

// ============================================================================
// Network Components
// ============================================================================

/// Low-pass feedback comb line
///
/// y[n] = x[n - d]; the line stores x[n] + feedback * lp(y[n])
#[derive(Debug, Clone)]
struct CombLine {
    line: DelayLine,
    delay: f32,
    /// One-pole low-pass state in the feedback path
    filter_state: f32,
}

impl CombLine {
    fn new(delay: usize) -> Result<Self> {
        Ok(Self {
            line: DelayLine::new(delay)?,
            delay: delay as f32,
            filter_state: 0.0,
        })
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> Result<f32> {
        let output = self.line.read(self.delay)?;
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;
        self.line.write(input + self.filter_state * feedback);
        Ok(output)
    }

    fn clear(&mut self) {
        self.line.clear();
        self.filter_state = 0.0;
    }
}

/// Schroeder allpass line
#[derive(Debug, Clone)]
struct AllpassLine {
    line: DelayLine,
    delay: f32,
}

impl AllpassLine {
    fn new(delay: usize) -> Result<Self> {
        Ok(Self {
            line: DelayLine::new(delay)?,
            delay: delay as f32,
        })
    }

    #[inline]
    fn process(&mut self, input: f32) -> Result<f32> {
        let delayed = self.line.read(self.delay)?;
        self.line.write(input + delayed * ALLPASS_GAIN);
        Ok(delayed - input)
    }

    fn clear(&mut self) {
        self.line.clear();
    }
}

/// One Freeverb network: parallel combs into series allpasses
///
/// Line lengths are the 44.1 kHz Freeverb tunings scaled to the sample
/// rate, each offset by `spread` samples.
#[derive(Debug, Clone)]
pub struct ReverbNetwork {
    combs: Vec<CombLine>,
    allpasses: Vec<AllpassLine>,
}

impl ReverbNetwork {
    pub fn new(sample_rate: u32, spread: usize) -> Result<Self> {
        let scale = sample_rate as f64 / REFERENCE_SAMPLE_RATE;
        let scaled = |delay: usize| (((delay + spread) as f64 * scale) as usize).max(1);

        let combs = COMB_DELAYS
            .iter()
            .map(|&d| CombLine::new(scaled(d)))
            .collect::<Result<Vec<_>>>()?;
        let allpasses = ALLPASS_DELAYS
            .iter()
            .map(|&d| AllpassLine::new(scaled(d)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { combs, allpasses })
    }

    /// Run one (already attenuated) input sample through the network
    #[inline]
    pub fn process_sample(&mut self, input: f32, feedback: f32, damp: f32) -> Result<f32> {
        let mut sum = 0.0;
        for comb in &mut self.combs {
            sum += comb.process(input, feedback, damp)?;
        }

        let mut output = sum;
        for allpass in &mut self.allpasses {
            output = allpass.process(output)?;
        }
        Ok(output)
    }

    pub fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombLine::clear);
        self.allpasses.iter_mut().for_each(AllpassLine::clear);
    }
}

/// Reference and spread networks fed by the same input
#[derive(Debug, Clone)]
struct NetworkPair {
    left: ReverbNetwork,
    right: ReverbNetwork,
}

impl NetworkPair {
    fn new(sample_rate: u32) -> Result<Self> {
        Ok(Self {
            left: ReverbNetwork::new(sample_rate, 0)?,
            right: ReverbNetwork::new(sample_rate, STEREO_SPREAD)?,
        })
    }

    fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }
}

// ============================================================================
// Main Reverb Effect
// ============================================================================

/// Reverb effect using the Freeverb algorithm
///
/// Stereo buffers share one network pair fed with the summed input and are
/// cross-blended by width. Any other channel count runs an independent pair
/// per channel.
#[derive(Debug, Clone)]
pub struct Reverb {
    params: ReverbParams,
    sample_rate: u32,
    template: NetworkPair,
    pairs: Vec<NetworkPair>,
}

impl Reverb {
    pub fn new(params: ReverbParams, sample_rate: u32) -> Result<Self> {
        params.validate()?;
        let template = NetworkPair::new(sample_rate)?;
        tracing::debug!(
            room_size = params.room_size,
            damping = params.damping,
            freeze_mode = params.freeze_mode,
            "reverb networks allocated"
        );

        Ok(Self {
            params,
            sample_rate,
            template,
            pairs: Vec::new(),
        })
    }

    /// Get a reference to the current parameters
    pub fn params(&self) -> &ReverbParams {
        &self.params
    }

    fn ensure_pairs(&mut self, count: usize) {
        while self.pairs.len() < count {
            self.pairs.push(self.template.clone());
        }
    }

    /// Process stereo audio
    fn process_stereo(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        self.ensure_pairs(1);
        let p = &self.params;
        let (feedback, damp, gain) = (p.feedback(), p.damp(), p.input_gain());
        let wet = p.wet_level * WET_SCALE;
        let wet1 = wet * (1.0 + p.width) / 2.0;
        let wet2 = wet * (1.0 - p.width) / 2.0;
        let dry = p.dry_level;
        let pair = &mut self.pairs[0];

        for i in 0..buffer.len() {
            let in_l = buffer.channel(0)[i];
            let in_r = buffer.channel(1)[i];
            let input = (in_l + in_r) * gain;

            let out_l = pair.left.process_sample(input, feedback, damp)?;
            let out_r = pair.right.process_sample(input, feedback, damp)?;

            buffer.channel_mut(0)[i] = in_l * dry + out_l * wet1 + out_r * wet2;
            buffer.channel_mut(1)[i] = in_r * dry + out_r * wet1 + out_l * wet2;
        }
        Ok(())
    }

    /// Process each channel through its own pair
    fn process_independent(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        self.ensure_pairs(buffer.num_channels());
        let p = &self.params;
        let (feedback, damp, gain) = (p.feedback(), p.damp(), p.input_gain());
        let wet = p.wet_level * WET_SCALE;
        let wet1 = wet * (1.0 + p.width) / 2.0;
        let wet2 = wet * (1.0 - p.width) / 2.0;
        let dry = p.dry_level;

        for (channel, pair) in buffer.channels_mut().zip(self.pairs.iter_mut()) {
            for sample in channel.iter_mut() {
                let input = *sample * gain;
                let out_l = pair.left.process_sample(input, feedback, damp)?;
                let out_r = pair.right.process_sample(input, feedback, damp)?;
                *sample = *sample * dry + out_l * wet1 + out_r * wet2;
            }
        }
        Ok(())
    }
}

impl Processor for Reverb {
    fn process(&mut self, buffer: &mut AudioBuffer) -> Result<()> {
        if buffer.num_channels() == 2 {
            self.process_stereo(buffer)
        } else {
            self.process_independent(buffer)
        }
    }

    fn reset(&mut self) {
        self.pairs.iter_mut().for_each(NetworkPair::clear);
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// ============================================================================
// Tests
// ============================================================================
