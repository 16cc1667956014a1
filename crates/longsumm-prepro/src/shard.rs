//! Shard accumulation: buffers records and writes numbered JSON array files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use longsumm_core::{CorpusType, Result};

/// Where numbered shards go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardNaming {
    /// `<prefix>.<split>.<n>.json`
    Prefix(PathBuf),
    /// `<dir>/<split>.<n>.json`
    Directory(PathBuf),
}

impl ShardNaming {
    pub fn path_for(&self, corpus_type: CorpusType, index: usize) -> PathBuf {
        match self {
            Self::Prefix(prefix) => {
                let mut name = prefix.as_os_str().to_os_string();
                name.push(format!(".{}.{}.json", corpus_type, index));
                PathBuf::from(name)
            }
            Self::Directory(dir) => dir.join(format!("{}.{}.json", corpus_type, index)),
        }
    }
}

/// What a writer produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardSummary {
    pub shards: Vec<PathBuf>,
    pub records: usize,
}

/// Buffers records for one split and flushes a shard every `shard_size`.
pub struct ShardWriter<T> {
    naming: ShardNaming,
    corpus_type: CorpusType,
    shard_size: usize,
    buffer: Vec<T>,
    summary: ShardSummary,
}

impl<T: Serialize> ShardWriter<T> {
    pub fn new(naming: ShardNaming, corpus_type: CorpusType, shard_size: usize) -> Self {
        let shard_size = shard_size.max(1);
        Self {
            naming,
            corpus_type,
            shard_size,
            buffer: Vec::with_capacity(shard_size),
            summary: ShardSummary::default(),
        }
    }

    pub fn push(&mut self, record: T) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.shard_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Records waiting for the next shard.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Write the final partial shard, if any.
    pub fn finish(mut self) -> Result<ShardSummary> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        info!(
            "{}: {} records in {} shards",
            self.corpus_type,
            self.summary.records,
            self.summary.shards.len()
        );
        Ok(self.summary)
    }

    fn flush(&mut self) -> Result<()> {
        let path = self
            .naming
            .path_for(self.corpus_type, self.summary.shards.len());
        write_json_array(&path, &self.buffer)?;
        info!("Wrote {} records to {}", self.buffer.len(), path.display());
        self.summary.records += self.buffer.len();
        self.summary.shards.push(path);
        self.buffer.clear();
        Ok(())
    }
}

/// Serialize `records` as one JSON array, creating parent directories.
pub fn write_json_array<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer(writer, records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming() {
        let prefix = ShardNaming::Prefix(PathBuf::from("/out/cnndm"));
        assert_eq!(
            prefix.path_for(CorpusType::Valid, 3),
            PathBuf::from("/out/cnndm.valid.3.json")
        );
        let dir = ShardNaming::Directory(PathBuf::from("/out"));
        assert_eq!(
            dir.path_for(CorpusType::Train, 0),
            PathBuf::from("/out/train.0.json")
        );
    }

    #[test]
    fn test_shards_capped_and_final_flush() {
        let dir = tempfile::tempdir().unwrap();
        let naming = ShardNaming::Prefix(dir.path().join("corpus"));
        let mut writer = ShardWriter::new(naming, CorpusType::Train, 2);
        for i in 0..5u32 {
            writer.push(i).unwrap();
        }
        assert_eq!(writer.pending(), 1);
        let summary = writer.finish().unwrap();

        assert_eq!(summary.records, 5);
        assert_eq!(summary.shards.len(), 3);
        let last: Vec<u32> =
            serde_json::from_str(&std::fs::read_to_string(&summary.shards[2]).unwrap()).unwrap();
        assert_eq!(last, vec![4]);
        let first: Vec<u32> =
            serde_json::from_str(&std::fs::read_to_string(&summary.shards[0]).unwrap()).unwrap();
        assert_eq!(first, vec![0, 1]);
    }

    #[test]
    fn test_empty_writer_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let naming = ShardNaming::Directory(dir.path().to_path_buf());
        let writer: ShardWriter<u32> = ShardWriter::new(naming, CorpusType::Test, 10);
        let summary = writer.finish().unwrap();
        assert!(summary.shards.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
