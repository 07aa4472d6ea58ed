//! Audio Engine Module
//!
//! Audio buffer type and level helpers shared by every effect.

pub mod buffer;

pub use buffer::{calculate_peak, calculate_rms, db_to_linear, linear_to_db, AudioBuffer};
