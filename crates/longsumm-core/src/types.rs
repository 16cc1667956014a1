//! Records exchanged between preprocessing stages and persisted in shards.

use serde::{Deserialize, Serialize};

/// Corpus split a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusType {
    Train,
    Valid,
    Test,
}

impl CorpusType {
    pub fn all() -> &'static [CorpusType] {
        &[Self::Train, Self::Valid, Self::Test]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Valid => "valid",
            Self::Test => "test",
        }
    }

    /// Parse a split name. `validation` and `dev` are accepted for `valid`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "train" => Some(Self::Train),
            "valid" | "validation" | "dev" => Some(Self::Valid),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    /// Splits selected by an optional dataset filter.
    pub fn selected(dataset: Option<&str>) -> Vec<CorpusType> {
        match dataset.and_then(Self::parse) {
            Some(ct) => vec![ct],
            None => Self::all().to_vec(),
        }
    }
}

impl std::fmt::Display for CorpusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tokenized document with its reference summary, as produced by a corpus
/// reader and stored in the intermediate (`*.json`) shards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExample {
    /// Source sentences, each a list of tokens.
    pub src: Vec<Vec<String>>,
    /// Section index per source sentence, non-decreasing.
    #[serde(default)]
    pub sections: Vec<usize>,
    /// Reference summary sentences.
    pub tgt: Vec<Vec<String>>,
}

impl RawExample {
    /// Section vector, filled with zeros when the reader had no structure.
    pub fn sections_or_default(&self) -> Vec<usize> {
        if self.sections.len() == self.src.len() {
            self.sections.clone()
        } else {
            vec![0; self.src.len()]
        }
    }
}

/// Fixed-shape training record.
///
/// Invariants: `sections`, `src_sent_labels` and `clss` have one entry per
/// sentence; `token_sections` and `segs` have one entry per subtoken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Source subtoken ids, `[CLS] s0 [SEP] [CLS] s1 [SEP] ...`.
    pub src: Vec<u32>,
    /// Target subtoken ids, `[unused0] t0 [unused2] t1 ... [unused1]`.
    pub tgt: Vec<u32>,
    /// 1 for sentences chosen by greedy selection.
    pub src_sent_labels: Vec<u8>,
    /// Alternating 0/1 segment id per subtoken, by sentence parity.
    pub segs: Vec<u8>,
    /// Position of each sentence's `[CLS]` marker.
    pub clss: Vec<usize>,
    pub src_txt: Vec<String>,
    /// Target sentences joined by `<q>`.
    pub tgt_txt: String,
    pub sections: Vec<usize>,
    pub token_sections: Vec<usize>,
}

impl TrainingRecord {
    pub fn num_sentences(&self) -> usize {
        self.clss.len()
    }

    /// Token count of each sentence, measured between consecutive `[CLS]`
    /// markers (the last sentence runs to the end of `src`).
    pub fn sentence_lengths(&self) -> Vec<usize> {
        self.clss
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = self.clss.get(i + 1).copied().unwrap_or(self.src.len());
                end - start
            })
            .collect()
    }
}
