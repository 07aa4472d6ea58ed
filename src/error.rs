//! Error handling for fxcore
//!
//! Every error is raised synchronously, either when an effect is built
//! or on the first block that trips it. Nothing is clamped silently.

use thiserror::Error;

/// Result type alias for fxcore operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for fxcore operations
#[derive(Error, Debug)]
pub enum FxError {
    // Configuration Errors
    #[error("Invalid parameter {param} = {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Sample rate mismatch: chain runs at {expected} Hz, buffer is {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Effect not found: {effect_id}")]
    EffectNotFound { effect_id: String },

    // Buffer Errors
    #[error("Invalid buffer: {reason}")]
    InvalidBuffer { reason: String },

    // Processing Errors
    #[error("Numerical instability in {effect}: non-finite output on channel {channel} at sample {index}")]
    NumericalInstability {
        effect: String,
        channel: usize,
        index: usize,
    },

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Shorthand for building an [`FxError::InvalidParameter`]
    pub fn invalid_parameter(
        param: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        FxError::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidParameter { .. } => "INVALID_PARAMETER",
            FxError::SampleRateMismatch { .. } => "SAMPLE_RATE_MISMATCH",
            FxError::EffectNotFound { .. } => "EFFECT_NOT_FOUND",
            FxError::InvalidBuffer { .. } => "INVALID_BUFFER",
            FxError::NumericalInstability { .. } => "NUMERICAL_INSTABILITY",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    ///
    /// Errors are deterministic in configuration and input, so every
    /// suggestion asks the host to change one of them. None suggest a retry.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FxError::InvalidParameter { .. } => vec![
                "Check the value against the documented parameter range",
                "Omit the parameter to fall back to its default",
            ],
            FxError::SampleRateMismatch { .. } => vec![
                "Resample the buffer to the chain's sample rate",
                "Rebuild the chain with set_sample_rate",
            ],
            FxError::InvalidBuffer { .. } => vec![
                "Make sure every channel has the same number of samples",
                "Remove NaN or infinite samples before processing",
            ],
            FxError::NumericalInstability { .. } => vec![
                "Reduce the feedback amount of the offending effect",
                "Reset the effect before feeding further blocks",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FxError::invalid_parameter("ratio", 0.0, "1.0 or greater");
        assert_eq!(err.error_code(), "INVALID_PARAMETER");

        let err = FxError::InvalidBuffer {
            reason: "ragged".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_BUFFER");
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = FxError::invalid_parameter("q", -1.0, "greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid parameter q = -1 (expected greater than 0)"
        );
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = FxError::NumericalInstability {
            effect: "delay".to_string(),
            channel: 0,
            index: 12,
        };
        assert!(!err.recovery_suggestions().is_empty());

        let err = FxError::EffectNotFound {
            effect_id: "missing".to_string(),
        };
        assert!(err.recovery_suggestions().is_empty());
    }
}
