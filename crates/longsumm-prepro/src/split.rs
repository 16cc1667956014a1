//! Train/valid/test assignment from mapping files.
//!
//! A mapping file lists one raw identifier (usually a story URL) per line.
//! Raw corpus files are named by the SHA-1 hex digest of that identifier, so
//! assignment is a hash lookup and does not depend on directory order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::{debug, info};

use longsumm_core::{CorpusType, Error, Result};

/// SHA-1 hex digest of a string.
pub fn hashhex(s: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashed identifiers per split.
#[derive(Debug, Clone, Default)]
pub struct CorpusMapping {
    splits: HashMap<CorpusType, HashSet<String>>,
}

impl CorpusMapping {
    /// Read `mapping_{train,valid,test}.txt` from `map_dir`.
    pub fn load(map_dir: &Path) -> Result<Self> {
        let mut mapping = Self::default();
        for &corpus_type in CorpusType::all() {
            let path = map_dir.join(format!("mapping_{}.txt", corpus_type));
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("cannot read mapping file {}: {}", path.display(), e))
            })?;
            mapping.insert_lines(corpus_type, content.lines());
        }
        info!(
            "Loaded corpus mapping: train={}, valid={}, test={}",
            mapping.len(CorpusType::Train),
            mapping.len(CorpusType::Valid),
            mapping.len(CorpusType::Test)
        );
        Ok(mapping)
    }

    /// Hash and register raw identifiers for a split.
    pub fn insert_lines<'a>(
        &mut self,
        corpus_type: CorpusType,
        lines: impl IntoIterator<Item = &'a str>,
    ) {
        let set = self.splits.entry(corpus_type).or_default();
        for line in lines {
            let line = line.trim();
            if !line.is_empty() {
                set.insert(hashhex(line));
            }
        }
    }

    pub fn len(&self, corpus_type: CorpusType) -> usize {
        self.splits.get(&corpus_type).map(HashSet::len).unwrap_or(0)
    }

    /// Split of a hashed name. Valid wins over test, test over train.
    pub fn classify(&self, hashed_name: &str) -> Option<CorpusType> {
        [CorpusType::Valid, CorpusType::Test, CorpusType::Train]
            .into_iter()
            .find(|ct| {
                self.splits
                    .get(ct)
                    .map(|set| set.contains(hashed_name))
                    .unwrap_or(false)
            })
    }

    /// Assign every `*.json` file in `raw_dir` to a split by its stem (the
    /// part before the first dot). Unmatched files are dropped. Each list
    /// is sorted.
    pub fn assign_files(&self, raw_dir: &Path) -> Result<BTreeMap<CorpusType, Vec<PathBuf>>> {
        let mut assigned: BTreeMap<CorpusType, Vec<PathBuf>> = CorpusType::all()
            .iter()
            .map(|&ct| (ct, Vec::new()))
            .collect();
        let mut unmatched = 0usize;

        for path in list_files(raw_dir, |name| name.ends_with(".json"))? {
            let stem = file_stem(&path);
            match self.classify(stem) {
                Some(ct) => assigned.entry(ct).or_default().push(path),
                None => unmatched += 1,
            }
        }
        for files in assigned.values_mut() {
            files.sort();
        }
        if unmatched > 0 {
            debug!("{} files in {} matched no split", unmatched, raw_dir.display());
        }
        Ok(assigned)
    }
}

/// Name up to the first dot, e.g. `abc` for `abc.story.json`.
pub fn file_stem(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or("")
}

/// Sorted regular files in `dir` whose name satisfies `keep`.
pub fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if path.is_file() && keep(name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read an XSum split file: `{"train": [ids], "validation": [ids], "test": [ids]}`.
pub fn load_xsum_split(path: &Path) -> Result<BTreeMap<CorpusType, Vec<String>>> {
    let content = std::fs::read_to_string(path)?;
    let raw: HashMap<String, Vec<String>> =
        serde_json::from_str(&content).map_err(|e| Error::parse(path, e.to_string()))?;
    let mut splits = BTreeMap::new();
    for (name, ids) in raw {
        match CorpusType::parse(&name) {
            Some(ct) => {
                splits.insert(ct, ids);
            }
            None => debug!("Ignoring unknown XSum split {:?}", name),
        }
    }
    Ok(splits)
}
