//! LongSumm Model: long-attention extractive encoder.
//!
//! Sentence vectors are contextualized by a stack of windowed/global
//! attention layers and scored by [`SentenceExtractor`]. Everything is a
//! plain `ndarray` forward pass with parameters drawn from a seeded RNG, so
//! two encoders built from the same [`ModelConfig`](longsumm_core::ModelConfig)
//! are identical.

pub mod attention;
pub mod document;
pub mod encoder;
pub mod extractor;
pub mod layer;
pub mod layers;
pub mod mask;
pub mod positional;

pub use attention::LongAttention;
pub use document::DocumentEncoder;
pub use encoder::{ExtractorInput, LongExtEncoder};
pub use extractor::{AuxEmbeddings, SentenceExtractor};
pub use layer::LongEncoderLayer;
pub use layers::{gelu, sigmoid, Embedding, LayerNorm, Linear, PositionwiseFeedForward};
pub use mask::{AttentionKind, AttentionMask};
pub use positional::PositionalEncoding;
