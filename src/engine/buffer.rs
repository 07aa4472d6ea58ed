//! Audio Buffer Management
//!
//! Provides the core audio buffer type and level helpers for fxcore.
//! Samples are stored non-interleaved as 32-bit floats, one `Vec<f32>` per channel.

use crate::error::{FxError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS (Root Mean Square) level of an audio buffer in dB
///
/// # Returns
/// RMS level in dB. Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.num_channels() * buffer.len();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
///
/// # Returns
/// Peak level in dB. Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Multi-channel block of audio plus its sample rate
///
/// All channels hold the same number of samples. Samples are nominally in
/// [-1.0, 1.0] but the engine never clamps them.
///
/// # Example
/// ```
/// use fxcore::engine::AudioBuffer;
///
/// // 1 second of stereo silence
/// let buffer = AudioBuffer::new(2, 44100, 44100);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer with the given channel count and length
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a zeroed buffer spanning `duration_secs` seconds
    pub fn silence(num_channels: usize, duration_secs: f64, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f64).round() as usize;
        Self::new(num_channels, num_samples, sample_rate)
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// Fails with [`FxError::InvalidBuffer`] on a zero sample rate, no
    /// channels, ragged channels or non-finite samples.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let buffer = Self {
            samples: channels,
            sample_rate,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(FxError::InvalidBuffer {
                reason: "channel count must be at least 1".to_string(),
            });
        }

        if interleaved.len() % num_channels != 0 {
            return Err(FxError::InvalidBuffer {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::from_channels(samples, sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// All channels, in order
    #[inline]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Mutable access to every channel at once (lengths cannot change)
    #[inline]
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.samples.iter_mut().map(|ch| ch.as_mut_slice())
    }

    /// Consume the buffer, returning the channel vectors
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.samples
    }

    /// Get a sample at the specified channel and index
    #[inline]
    pub fn get_sample(&self, channel: usize, index: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(index).copied())
    }

    /// Replace the channel layout; only effects that change the channel
    /// count (mono to stereo) need this
    pub(crate) fn replace_channels(&mut self, channels: Vec<Vec<f32>>) {
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        self.samples = channels;
    }

    /// Copy `len` samples starting at `start` into a new buffer
    ///
    /// The range is truncated at the end of the buffer.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        let start = start.min(self.len());
        let end = start.saturating_add(len).min(self.len());
        Self {
            samples: self
                .samples
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Append another buffer with the same layout and sample rate
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(FxError::InvalidBuffer {
                reason: format!(
                    "cannot append {} Hz audio to a {} Hz buffer",
                    other.sample_rate, self.sample_rate
                ),
            });
        }
        if other.num_channels() != self.num_channels() {
            return Err(FxError::InvalidBuffer {
                reason: format!(
                    "cannot append {} channels to a {} channel buffer",
                    other.num_channels(),
                    self.num_channels()
                ),
            });
        }

        for (dst, src) in self.samples.iter_mut().zip(&other.samples) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Check the buffer invariants at ingestion
    ///
    /// # Returns
    /// * `Ok(())` if the buffer has a positive sample rate, at least one
    ///   channel, equal channel lengths and only finite samples
    /// * `Err(FxError::InvalidBuffer)` describing the first violation
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FxError::InvalidBuffer {
                reason: "sample rate must be positive".to_string(),
            });
        }

        if self.samples.is_empty() {
            return Err(FxError::InvalidBuffer {
                reason: "buffer has no channels".to_string(),
            });
        }

        let expected = self.len();
        if let Some((ch, channel)) = self
            .samples
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != expected)
        {
            return Err(FxError::InvalidBuffer {
                reason: format!(
                    "channel {} has {} samples, channel 0 has {}",
                    ch,
                    channel.len(),
                    expected
                ),
            });
        }

        for (ch, channel) in self.samples.iter().enumerate() {
            if let Some(index) = channel.iter().position(|s| !s.is_finite()) {
                return Err(FxError::InvalidBuffer {
                    reason: format!("non-finite sample on channel {} at index {}", ch, index),
                });
            }
        }

        Ok(())
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Position of the first non-finite sample, as `(channel, index)`
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.samples.iter().enumerate().find_map(|(ch, channel)| {
            channel
                .iter()
                .position(|s| !s.is_finite())
                .map(|index| (ch, index))
        })
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(1, 0, 44100)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer::from_channels(samples, 44100).unwrap()
    }

    // ------------------------------------------------------------------------
    // Unit conversion tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_db_to_linear() {
        assert_relative_eq!(db_to_linear(0.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(db_to_linear(-6.0206), 0.5, epsilon = 1e-4);
        assert_relative_eq!(db_to_linear(-20.0), 0.1, epsilon = 1e-6);
        assert!(db_to_linear(-120.0) < 1e-5);
    }

    #[test]
    fn test_linear_to_db() {
        assert_relative_eq!(linear_to_db(1.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(linear_to_db(0.1), -20.0, epsilon = 1e-4);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    // ------------------------------------------------------------------------
    // Level tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_calculate_rms_silence() {
        let buffer = create_test_buffer(vec![vec![0.0; 1000]]);
        let rms = calculate_rms(&buffer);
        assert!(rms.is_infinite() && rms.is_sign_negative());
    }

    #[test]
    fn test_calculate_rms_unity() {
        let buffer = create_test_buffer(vec![vec![1.0; 1000]]);
        assert_relative_eq!(calculate_rms(&buffer), 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_calculate_peak() {
        let buffer = create_test_buffer(vec![vec![0.1, -0.5, 0.25], vec![0.0, 0.2, 0.0]]);
        assert_relative_eq!(calculate_peak(&buffer), linear_to_db(0.5), epsilon = 1e-5);
    }

    // ------------------------------------------------------------------------
    // Construction and validation tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_new_buffer() {
        let buffer = AudioBuffer::new(2, 1000, 48000);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.sample_rate(), 48000);
        assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_silence_duration() {
        let buffer = AudioBuffer::silence(1, 1.0, 44100);
        assert_eq!(buffer.len(), 44100);
        assert_relative_eq!(buffer.duration_secs(), 1.0);
    }

    #[test]
    fn test_ragged_channels_rejected() {
        let err = AudioBuffer::from_channels(vec![vec![0.0; 10], vec![0.0; 9]], 44100)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BUFFER");
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = AudioBuffer::from_channels(vec![vec![0.0, f32::NAN]], 44100).unwrap_err();
        assert!(matches!(err, FxError::InvalidBuffer { .. }));

        let err = AudioBuffer::from_channels(vec![vec![f32::INFINITY]], 44100).unwrap_err();
        assert!(matches!(err, FxError::InvalidBuffer { .. }));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(AudioBuffer::from_channels(vec![vec![0.0; 4]], 0).is_err());
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();
        assert_eq!(buffer.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_interleaved_bad_length() {
        assert!(AudioBuffer::from_interleaved(&[0.0; 5], 2, 44100).is_err());
    }

    #[test]
    fn test_slice_and_append() {
        let buffer = create_test_buffer(vec![(0..10).map(|i| i as f32 * 0.1).collect()]);
        let mut head = buffer.slice(0, 4);
        let tail = buffer.slice(4, 100);
        assert_eq!(head.len(), 4);
        assert_eq!(tail.len(), 6);

        head.append(&tail).unwrap();
        assert_eq!(head, buffer);
    }

    #[test]
    fn test_append_rejects_layout_mismatch() {
        let mut mono = AudioBuffer::new(1, 4, 44100);
        let stereo = AudioBuffer::new(2, 4, 44100);
        assert!(mono.append(&stereo).is_err());

        let other_rate = AudioBuffer::new(1, 4, 48000);
        assert!(mono.append(&other_rate).is_err());
    }

    #[test]
    fn test_first_non_finite() {
        let mut buffer = AudioBuffer::new(2, 8, 44100);
        assert_eq!(buffer.first_non_finite(), None);
        buffer.channel_mut(1)[5] = f32::NAN;
        assert_eq!(buffer.first_non_finite(), Some((1, 5)));
        assert!(!buffer.is_finite());
    }
}
