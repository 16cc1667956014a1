//! Preprocessing and model configuration.
//!
//! Both structs are built once (defaults, optionally a JSON file, then CLI
//! overrides) and passed by reference into every component.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Limits and switches for turning raw documents into training records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Documents with fewer retained sentences are dropped (non-test splits).
    pub min_src_nsents: usize,
    /// Sentences beyond this count are cut.
    pub max_src_nsents: usize,
    /// Sentences need strictly more tokens than this to be kept.
    pub min_src_ntokens_per_sent: usize,
    /// Each kept sentence is truncated to this many tokens.
    pub max_src_ntokens_per_sent: usize,
    /// Documents whose target is shorter are dropped (non-test splits).
    pub min_tgt_ntokens: usize,
    /// Target subtokens beyond this count are cut.
    pub max_tgt_ntokens: usize,
    /// Records per output shard.
    pub shard_size: usize,
    /// Lowercase source and target before tokenization.
    pub lower: bool,
    /// Use the basic (punctuation/whitespace) tokenizer for targets.
    pub use_bert_basic_tokenizer: bool,
    /// Worker pool size.
    pub n_cpus: usize,
    /// Restrict processing to one split (`train`, `valid`, `test`).
    pub dataset: Option<String>,
    /// Fraction of source sentences labelled by greedy selection.
    pub summary_ratio: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_src_nsents: 3,
            max_src_nsents: 100,
            min_src_ntokens_per_sent: 5,
            max_src_ntokens_per_sent: 200,
            min_tgt_ntokens: 5,
            max_tgt_ntokens: 500,
            shard_size: 2000,
            lower: true,
            use_bert_basic_tokenizer: false,
            n_cpus: 2,
            dataset: None,
            summary_ratio: 0.2,
        }
    }
}

impl PreprocessConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shard_size == 0 {
            return Err(Error::Config("shard_size must be positive".into()));
        }
        if self.n_cpus == 0 {
            return Err(Error::Config("n_cpus must be positive".into()));
        }
        if self.min_src_nsents > self.max_src_nsents {
            return Err(Error::Config(format!(
                "min_src_nsents ({}) exceeds max_src_nsents ({})",
                self.min_src_nsents, self.max_src_nsents
            )));
        }
        if !(0.0..=1.0).contains(&self.summary_ratio) {
            return Err(Error::Config(format!(
                "summary_ratio must be in [0, 1], got {}",
                self.summary_ratio
            )));
        }
        if let Some(ds) = &self.dataset {
            if !matches!(ds.as_str(), "train" | "valid" | "test") {
                return Err(Error::Config(format!("unknown dataset split: {}", ds)));
            }
        }
        Ok(())
    }

    /// Number of sentences greedy selection should label for a document.
    pub fn summary_size(&self, n_sents: usize) -> usize {
        (self.summary_ratio * n_sents as f64).floor() as usize
    }
}

/// Hyperparameters of the long-attention extractive encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden_size: usize,
    pub num_attention_heads: usize,
    pub num_hidden_layers: usize,
    pub intermediate_size: usize,
    /// Full attention window in sentences; each side sees `window / 2`.
    pub attention_window: usize,
    /// Rows of the sinusoidal position table.
    pub max_position_embeddings: usize,
    /// Rows of the learned section table.
    pub section_size: usize,
    /// Rows of the learned absolute-position table.
    pub position_table_size: usize,
    /// Rows of the learned sentence-length table.
    pub length_buckets: usize,
    pub layer_norm_eps: f32,
    /// Kept for parity with training configs; inference ignores it.
    pub hidden_dropout_prob: f32,
    /// Seed for deterministic parameter initialization.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_size: 768,
            num_attention_heads: 12,
            num_hidden_layers: 2,
            intermediate_size: 2048,
            attention_window: 10,
            max_position_embeddings: 512,
            section_size: 100,
            position_table_size: 500,
            length_buckets: 200,
            layer_norm_eps: 1e-6,
            hidden_dropout_prob: 0.1,
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            return Err(Error::Config(format!(
                "hidden_size ({}) is not a multiple of num_attention_heads ({})",
                self.hidden_size, self.num_attention_heads
            )));
        }
        if self.attention_window == 0 || self.attention_window % 2 != 0 {
            return Err(Error::Config(format!(
                "attention_window must be a positive even number, got {}",
                self.attention_window
            )));
        }
        if self.section_size == 0 || self.position_table_size == 0 || self.length_buckets == 0 {
            return Err(Error::Config("embedding tables need at least one row".into()));
        }
        Ok(())
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// Sentences each position sees on either side.
    pub fn one_sided_window(&self) -> usize {
        self.attention_window / 2
    }
}
