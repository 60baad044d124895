//! Core pipeline logic: series handling, feature engineering, training,
//! prediction and correlation analysis.

pub mod artifact;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod series;
pub mod settings;
pub mod trainer;
