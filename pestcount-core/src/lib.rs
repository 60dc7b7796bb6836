pub mod analysis;
pub mod config;
pub mod consts;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod process;
pub mod render;

// Re-export commonly used types
pub use analysis::{
    count::{CountResult, LabelSummary, Severity},
    detection::Detection,
    insects::{BeneficialList, InsectClassifier, InsectKind},
    labels::LabelSet,
};
pub use config::{DetectorConfig, InputLayout};
pub use error::PestCountError;
pub use pipeline::{DetectionOutput, Pipeline, SharedPipeline};
