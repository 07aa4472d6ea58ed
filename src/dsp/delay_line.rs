//! Circular delay line with fractional read
//!
//! Backs Delay, Chorus, Stereo and the Reverb network lines. Capacity is
//! fixed at construction and never reallocated while processing.

use crate::error::{FxError, Result};

/// Fixed-capacity circular buffer of past samples
///
/// `read(d)` returns the value written `d` writes ago. Call it before
/// `write` for the current sample; `d` may be fractional, in which case the
/// two neighbouring integer offsets are linearly interpolated.
#[derive(Debug, Clone)]
pub struct DelayLine {
    /// Circular buffer storage
    buffer: Vec<f32>,
    /// Next slot to write
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line holding `capacity` past samples
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FxError::invalid_parameter(
                "capacity",
                capacity,
                "at least 1 sample",
            ));
        }

        Ok(Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
        })
    }

    /// Create a delay line long enough for `seconds` at `sample_rate`,
    /// rounded up to a whole sample
    pub fn from_seconds(seconds: f64, sample_rate: u32) -> Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(FxError::invalid_parameter(
                "delay_seconds",
                seconds,
                "a positive duration",
            ));
        }
        Self::new((seconds * sample_rate as f64).ceil() as usize)
    }

    /// Maximum delay in samples
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Push a sample and advance the head
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Read `delay` samples behind the head, interpolating fractional offsets
    ///
    /// `delay` must lie in `[1, capacity]`. Anything else is a caller bug and
    /// reported as [`FxError::InvalidParameter`].
    #[inline]
    pub fn read(&self, delay: f32) -> Result<f32> {
        let capacity = self.buffer.len();
        if !(delay >= 1.0 && delay <= capacity as f32) {
            return Err(FxError::invalid_parameter(
                "delay_samples",
                delay,
                format!("1 to {} samples", capacity),
            ));
        }

        let whole = delay.floor();
        let frac = delay - whole;
        let near = self.tap(whole as usize);
        if frac == 0.0 {
            return Ok(near);
        }
        let far = self.tap(whole as usize + 1);
        Ok(near + (far - near) * frac)
    }

    /// Integer read; `offset` in `[1, capacity]`
    #[inline]
    fn tap(&self, offset: usize) -> f32 {
        let len = self.buffer.len();
        self.buffer[(self.write_pos + len - offset) % len]
    }

    /// Zero the contents and rewind the head
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integer_delay() {
        let mut line = DelayLine::new(4).unwrap();
        let mut outputs = Vec::new();
        for x in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            outputs.push(line.read(3.0).unwrap());
            line.write(x);
        }
        assert_eq!(outputs, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_full_capacity_read() {
        let mut line = DelayLine::new(3).unwrap();
        for x in [1.0, 2.0, 3.0] {
            line.write(x);
        }
        assert_eq!(line.read(3.0).unwrap(), 1.0);
        assert_eq!(line.read(1.0).unwrap(), 3.0);
    }

    #[test]
    fn test_fractional_delay_interpolates() {
        let mut line = DelayLine::new(8).unwrap();
        line.write(0.0);
        line.write(1.0);
        // 1 sample ago = 1.0, 2 samples ago = 0.0
        assert_relative_eq!(line.read(1.25).unwrap(), 0.75);
        assert_relative_eq!(line.read(1.5).unwrap(), 0.5);
    }

    #[test]
    fn test_read_out_of_range_rejected() {
        let line = DelayLine::new(16).unwrap();
        assert!(line.read(16.5).is_err());
        assert!(line.read(0.5).is_err());
        assert!(line.read(f32::NAN).is_err());
        assert!(line.read(16.0).is_ok());
    }

    #[test]
    fn test_from_seconds_rounds_up() {
        let line = DelayLine::from_seconds(0.0101, 1000).unwrap();
        assert_eq!(line.capacity(), 11);
        assert!(DelayLine::from_seconds(0.0, 44100).is_err());
        assert!(DelayLine::new(0).is_err());
    }

    #[test]
    fn test_clear() {
        let mut line = DelayLine::new(2).unwrap();
        line.write(1.0);
        line.clear();
        assert_eq!(line.read(1.0).unwrap(), 0.0);
        assert_eq!(line.read(2.0).unwrap(), 0.0);
    }
}
