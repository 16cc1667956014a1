//! Corpus readers: CoreNLP sentence JSON, paper/slide pairs, XSum text pairs.
//!
//! Every reader yields a [`RawExample`]. Malformed files surface as
//! [`Error::Parse`] so the caller can skip the document.

use std::path::Path;

use serde::Deserialize;

use longsumm_core::{Error, RawExample, Result};

use crate::text::clean_sentences;

/// Marker that opens a reference-summary sentence in CNN/DM story files.
const HIGHLIGHT: &str = "@highlight";

#[derive(Debug, Deserialize)]
struct CoreNlpDocument {
    sentences: Vec<CoreNlpSentence>,
}

#[derive(Debug, Deserialize)]
struct CoreNlpSentence {
    tokens: Vec<CoreNlpToken>,
}

#[derive(Debug, Deserialize)]
struct CoreNlpToken {
    word: String,
    #[serde(default)]
    after: String,
}

fn read_corenlp(path: &Path) -> Result<CoreNlpDocument> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| Error::parse(path, e.to_string()))
}

fn words(sentence: &CoreNlpSentence, lower: bool) -> Vec<String> {
    sentence
        .tokens
        .iter()
        .map(|t| if lower { t.word.to_lowercase() } else { t.word.clone() })
        .collect()
}

/// Read a CoreNLP-tokenized story.
///
/// Sentences before the first `@highlight` form the source; every
/// `@highlight` opens a target sentence that the following sentences extend.
/// A source sentence followed by a newline closes its section.
pub fn load_corenlp_json(path: &Path, lower: bool) -> Result<RawExample> {
    let doc = read_corenlp(path)?;

    let mut src = Vec::new();
    let mut sections = Vec::new();
    let mut tgt: Vec<Vec<String>> = Vec::new();
    let mut in_highlights = false;
    let mut section = 0usize;

    for sentence in &doc.sentences {
        let tokens = words(sentence, lower);
        let Some(first) = tokens.first() else {
            continue;
        };
        // Matched after lowercasing, so `@Highlight` counts when `lower` is set.
        if first == HIGHLIGHT {
            in_highlights = true;
            tgt.push(Vec::new());
            continue;
        }
        if in_highlights {
            if let Some(last) = tgt.last_mut() {
                last.extend(tokens);
            }
        } else {
            src.push(tokens);
            sections.push(section);
            if sentence.tokens.last().map(|t| t.after == "\n").unwrap_or(false) {
                section += 1;
            }
        }
    }

    Ok(RawExample {
        src: clean_sentences(src),
        sections,
        tgt: clean_sentences(tgt),
    })
}

/// Read a paper (source) and its slides (target), both CoreNLP JSON.
pub fn load_paper_pair(paper: &Path, slides: &Path, lower: bool) -> Result<RawExample> {
    let src: Vec<Vec<String>> = read_corenlp(paper)?
        .sentences
        .iter()
        .map(|s| words(s, lower))
        .collect();
    let tgt: Vec<Vec<String>> = read_corenlp(slides)?
        .sentences
        .iter()
        .map(|s| words(s, lower))
        .collect();

    let sections = vec![0; src.len()];
    Ok(RawExample {
        src: clean_sentences(src),
        sections,
        tgt: clean_sentences(tgt),
    })
}

/// Read an XSum body/summary pair, one whitespace-tokenized sentence per line.
///
/// Returns `Ok(None)` when either file is missing.
pub fn load_xsum_pair(body: &Path, summary: &Path) -> Result<Option<RawExample>> {
    if !body.exists() || !summary.exists() {
        return Ok(None);
    }
    let read_lines = |path: &Path| -> Result<Vec<Vec<String>>> {
        Ok(std::fs::read_to_string(path)?
            .lines()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect())
    };
    let src = read_lines(body)?;
    let tgt = read_lines(summary)?;
    let sections = vec![0; src.len()];
    Ok(Some(RawExample { src, sections, tgt }))
}
