//! Signal analysis feeding adaptive processing

pub mod features;

pub use features::{MirFeatureEstimator, MirFeatureSet};
