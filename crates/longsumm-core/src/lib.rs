//! LongSumm Core: configuration, error taxonomy, shared data records.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ModelConfig, PreprocessConfig};
pub use error::{Error, Result};
pub use types::{CorpusType, RawExample, TrainingRecord};
