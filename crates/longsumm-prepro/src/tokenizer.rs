//! Subword tokenizer seam.
//!
//! The `SubwordTokenizer` trait abstracts the pretrained vocabulary.
//! `BertTokenizer` backs it with the `tokenizers` WordPiece model, loaded
//! either from a BERT `vocab.txt` or a HuggingFace `tokenizer.json`.

use std::path::Path;

use tokenizers::models::wordpiece::WordPiece;
use tokenizers::models::ModelWrapper;
use tokenizers::Model;
use tracing::info;

use longsumm_core::{Error, Result};

use crate::text::basic_tokenize;

pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
/// Target begin marker.
pub const TGT_BOS: &str = "[unused0]";
/// Target end marker.
pub const TGT_EOS: &str = "[unused1]";
/// Target sentence separator.
pub const TGT_SENT_SPLIT: &str = "[unused2]";

/// Trait for subword vocabularies.
pub trait SubwordTokenizer: Send + Sync {
    /// Split one pre-token into subword pieces.
    fn wordpiece(&self, word: &str) -> Result<Vec<String>>;

    /// Vocabulary id of a token, if present.
    fn token_to_id(&self, token: &str) -> Option<u32>;

    /// Whether the basic pre-tokenizer lowercases.
    fn do_lower_case(&self) -> bool;

    /// Pre-tokenize `text` (whitespace, or punctuation-aware when `basic`),
    /// then split every pre-token into subwords.
    fn tokenize(&self, text: &str, basic: bool) -> Result<Vec<String>> {
        let pretokens: Vec<String> = if basic {
            basic_tokenize(text, self.do_lower_case())
        } else {
            text.split_whitespace().map(str::to_string).collect()
        };
        let mut out = Vec::with_capacity(pretokens.len());
        for token in &pretokens {
            out.extend(self.wordpiece(token)?);
        }
        Ok(out)
    }

    /// Map tokens to ids; unknown tokens map to `[UNK]` (or 0 without one).
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        let unk = self.token_to_id(UNK_TOKEN).unwrap_or(0);
        tokens
            .iter()
            .map(|t| self.token_to_id(t).unwrap_or(unk))
            .collect()
    }

    /// Id of a required special token.
    fn special_id(&self, token: &str) -> Result<u32> {
        self.token_to_id(token)
            .ok_or_else(|| Error::Tokenizer(format!("vocabulary has no {} token", token)))
    }
}

/// WordPiece tokenizer over a BERT vocabulary.
pub struct BertTokenizer {
    model: WordPiece,
    do_lower_case: bool,
}

impl BertTokenizer {
    /// Load a one-token-per-line BERT `vocab.txt`.
    pub fn from_vocab_file(path: &Path, do_lower_case: bool) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::Tokenizer(format!("non UTF-8 path: {}", path.display())))?;
        let model = WordPiece::from_file(path_str)
            .unk_token(UNK_TOKEN.to_string())
            .build()
            .map_err(|e| Error::Tokenizer(format!("failed to load {}: {}", path.display(), e)))?;
        info!("Loaded WordPiece vocabulary: {}", path.display());
        Ok(Self {
            model,
            do_lower_case,
        })
    }

    /// Load the WordPiece model out of a HuggingFace `tokenizer.json`.
    pub fn from_tokenizer_json(path: &Path, do_lower_case: bool) -> Result<Self> {
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("failed to load {}: {}", path.display(), e)))?;
        match tokenizer.get_model().clone() {
            ModelWrapper::WordPiece(model) => {
                info!("Loaded WordPiece tokenizer: {}", path.display());
                Ok(Self {
                    model,
                    do_lower_case,
                })
            }
            _ => Err(Error::Tokenizer(format!(
                "{} does not contain a WordPiece model",
                path.display()
            ))),
        }
    }

    /// Load from a file, picking the format by extension.
    pub fn load(path: &Path, do_lower_case: bool) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_tokenizer_json(path, do_lower_case),
            _ => Self::from_vocab_file(path, do_lower_case),
        }
    }

    /// Build from an in-memory token list; ids follow list order.
    ///
    /// Goes through the model's serialized form, which owns the vocabulary
    /// map type the builder expects.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], do_lower_case: bool) -> Result<Self> {
        let vocab: serde_json::Map<String, serde_json::Value> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_ref().to_string(), serde_json::Value::from(i as u32)))
            .collect();
        let model: WordPiece = serde_json::from_value(serde_json::json!({
            "unk_token": UNK_TOKEN,
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab,
        }))
        .map_err(|e| Error::Tokenizer(format!("invalid in-memory vocabulary: {}", e)))?;
        Ok(Self {
            model,
            do_lower_case,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.model.get_vocab_size()
    }
}

impl SubwordTokenizer for BertTokenizer {
    fn wordpiece(&self, word: &str) -> Result<Vec<String>> {
        let tokens = self
            .model
            .tokenize(word)
            .map_err(|e| Error::Tokenizer(format!("failed to tokenize {:?}: {}", word, e)))?;
        Ok(tokens.into_iter().map(|t| t.value).collect())
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.model.token_to_id(token)
    }

    fn do_lower_case(&self) -> bool {
        self.do_lower_case
    }
}
