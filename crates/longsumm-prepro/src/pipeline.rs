//! Corpus pipelines: raw corpus → intermediate line shards → training records.
//!
//! Each document (or, for `format_to_bert`, each input shard) is one task on
//! the worker pool. Unreadable documents are logged and skipped; documents
//! too small to train on are dropped silently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use longsumm_core::{CorpusType, Error, PreprocessConfig, RawExample, Result, TrainingRecord};

use crate::bert_data::BertData;
use crate::formats::{load_corenlp_json, load_paper_pair, load_xsum_pair};
use crate::greedy::greedy_selection;
use crate::pool::WorkerPool;
use crate::shard::{write_json_array, ShardNaming, ShardWriter};
use crate::split::{list_files, load_xsum_split, CorpusMapping};
use crate::text::lowercase_sentences;
use crate::tokenizer::SubwordTokenizer;

/// XSum split definition shipped with the corpus.
pub const XSUM_SPLIT_FILE: &str = "XSum-TRAINING-DEV-TEST-SPLIT-90-5-5.json";

/// Paper/slide pair indices per split (upper bounds exclusive).
const PAPER_TRAIN: std::ops::Range<usize> = 0..4000;
const PAPER_VALID: std::ops::Range<usize> = 4001..4250;
const PAPER_TEST: std::ops::Range<usize> = 4251..4500;

/// Outcome of one split.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitReport {
    pub shards: Vec<PathBuf>,
    pub records: usize,
    pub skipped: usize,
}

pub type PipelineReport = BTreeMap<CorpusType, SplitReport>;

/// Shard every split's documents through `load` on the pool.
fn shard_documents<J, F>(
    config: &PreprocessConfig,
    naming: &ShardNaming,
    jobs: BTreeMap<CorpusType, Vec<J>>,
    load: F,
) -> Result<PipelineReport>
where
    J: Send + 'static,
    F: Fn(J) -> Result<Option<RawExample>> + Send + Sync + Clone + 'static,
{
    let pool = WorkerPool::new(config.n_cpus)?;
    let mut report = PipelineReport::new();

    for (corpus_type, split_jobs) in jobs {
        info!("{}: processing {} documents", corpus_type, split_jobs.len());
        let mut writer = ShardWriter::new(naming.clone(), corpus_type, config.shard_size);
        let mut skipped = 0usize;

        pool.run(split_jobs, load.clone(), |result| {
            match result {
                Ok(Some(example)) => writer.push(example)?,
                Ok(None) => skipped += 1,
                Err(e) => {
                    skipped += 1;
                    if e.is_per_document() {
                        warn!("Skipping document: {}", e);
                    } else {
                        error!("Skipping document: {}", e);
                    }
                }
            }
            Ok(())
        })?;

        let summary = writer.finish()?;
        report.insert(
            corpus_type,
            SplitReport {
                shards: summary.shards,
                records: summary.records,
                skipped,
            },
        );
    }
    Ok(report)
}

/// CoreNLP story JSON → `<save_prefix>.<split>.<n>.json`, split by mapping files.
pub fn format_to_lines(
    raw_path: &Path,
    save_prefix: &Path,
    map_path: &Path,
    config: &PreprocessConfig,
) -> Result<PipelineReport> {
    let mapping = CorpusMapping::load(map_path)?;
    let mut assigned = mapping.assign_files(raw_path)?;
    let selected = CorpusType::selected(config.dataset.as_deref());
    assigned.retain(|ct, _| selected.contains(ct));

    let lower = config.lower;
    shard_documents(
        config,
        &ShardNaming::Prefix(save_prefix.to_path_buf()),
        assigned,
        move |path: PathBuf| load_corenlp_json(&path, lower).map(Some),
    )
}

/// XSum body/summary pairs → `<save_prefix>.<split>.<n>.json`.
pub fn format_xsum_to_lines(
    raw_path: &Path,
    save_prefix: &Path,
    config: &PreprocessConfig,
) -> Result<PipelineReport> {
    let mut splits = load_xsum_split(&raw_path.join(XSUM_SPLIT_FILE))?;
    let selected = CorpusType::selected(config.dataset.as_deref());
    splits.retain(|ct, _| selected.contains(ct));

    let root_src = raw_path.join("restbody");
    let root_tgt = raw_path.join("firstsentence");
    let jobs = splits
        .into_iter()
        .map(|(ct, ids)| {
            let pairs = ids
                .into_iter()
                .map(|id| {
                    (
                        root_src.join(format!("{}.restbody", id)),
                        root_tgt.join(format!("{}.fs", id)),
                    )
                })
                .collect();
            (ct, pairs)
        })
        .collect();

    shard_documents(
        config,
        &ShardNaming::Prefix(save_prefix.to_path_buf()),
        jobs,
        |(body, summary): (PathBuf, PathBuf)| {
            let example = load_xsum_pair(&body, &summary)?;
            if example.is_none() {
                debug!("No XSum pair for {}", body.display());
            }
            Ok(example)
        },
    )
}

/// Paper/slide pairs under `<raw>/<i>/` → `<save_dir>/<split>.<n>.json`.
pub fn format_paper_to_lines(
    raw_path: &Path,
    save_dir: &Path,
    config: &PreprocessConfig,
) -> Result<PipelineReport> {
    let selected = CorpusType::selected(config.dataset.as_deref());
    let jobs: BTreeMap<CorpusType, Vec<(PathBuf, PathBuf)>> = [
        (CorpusType::Train, PAPER_TRAIN),
        (CorpusType::Valid, PAPER_VALID),
        (CorpusType::Test, PAPER_TEST),
    ]
    .into_iter()
    .filter(|(ct, _)| selected.contains(ct))
    .map(|(ct, range)| {
        let pairs = range
            .map(|i| {
                let dir = raw_path.join(i.to_string());
                (
                    dir.join("grobid").join("sections.stanfordnlp.json"),
                    dir.join("clean_tika.txt.json"),
                )
            })
            .filter(|(paper, slides)| paper.exists() && slides.exists())
            .collect();
        (ct, pairs)
    })
    .collect();

    std::fs::create_dir_all(save_dir)?;
    let lower = config.lower;
    shard_documents(
        config,
        &ShardNaming::Directory(save_dir.to_path_buf()),
        jobs,
        move |(paper, slides): (PathBuf, PathBuf)| load_paper_pair(&paper, &slides, lower).map(Some),
    )
}

/// Label a document with greedy selection and assemble its training record.
pub fn build_record(
    example: &RawExample,
    bert: &BertData<'_>,
    config: &PreprocessConfig,
    is_test: bool,
) -> Result<Option<TrainingRecord>> {
    let sections = example.sections_or_default();
    let summary_size = config.summary_size(example.src.len());
    let labelled = &example.src[..example.src.len().min(config.max_src_nsents)];
    let sent_labels = greedy_selection(labelled, &example.tgt, summary_size);

    if config.lower {
        let src = lowercase_sentences(&example.src);
        let tgt = lowercase_sentences(&example.tgt);
        bert.preprocess(&src, &sections, &tgt, &sent_labels, is_test)
    } else {
        bert.preprocess(&example.src, &sections, &example.tgt, &sent_labels, is_test)
    }
}

/// Output name for an intermediate shard: `x.train.0.json` → `x.train.0.bert.json`.
pub fn bert_file_name(json_file: &Path) -> String {
    let name = json_file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("shard.json");
    let stem = name.strip_suffix(".json").unwrap_or(name);
    format!("{}.bert.json", stem)
}

/// Convert one intermediate shard; `None` when the output already exists.
fn format_shard_to_bert(
    corpus_type: CorpusType,
    json_file: &Path,
    save_file: &Path,
    tokenizer: &dyn SubwordTokenizer,
    config: &PreprocessConfig,
) -> Result<Option<SplitReport>> {
    if save_file.exists() {
        info!("Ignore {}, already exists", save_file.display());
        return Ok(None);
    }
    let is_test = corpus_type == CorpusType::Test;
    let bert = BertData::new(tokenizer, config)?;

    info!("Processing {}", json_file.display());
    let content = std::fs::read_to_string(json_file)?;
    let jobs: Vec<RawExample> =
        serde_json::from_str(&content).map_err(|e| Error::parse(json_file, e.to_string()))?;

    let mut records = Vec::with_capacity(jobs.len());
    let mut skipped = 0usize;
    for (i, example) in jobs.iter().enumerate() {
        match build_record(example, &bert, config, is_test) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => skipped += 1,
            Err(e) => {
                skipped += 1;
                warn!("Skipping document {} of {}: {}", i, json_file.display(), e);
            }
        }
    }

    info!("Processed {} instances", records.len());
    info!("Saving to {}", save_file.display());
    write_json_array(save_file, &records)?;
    Ok(Some(SplitReport {
        shards: vec![save_file.to_path_buf()],
        records: records.len(),
        skipped,
    }))
}

/// Intermediate shards `<raw>/*<split>.*.json` → `<save_dir>/*.bert.json`.
///
/// Shards are the unit of parallelism; shards already converted are skipped.
pub fn format_to_bert(
    raw_path: &Path,
    save_dir: &Path,
    config: &PreprocessConfig,
    tokenizer: Arc<dyn SubwordTokenizer>,
) -> Result<PipelineReport> {
    std::fs::create_dir_all(save_dir)?;
    let pool = WorkerPool::new(config.n_cpus)?;
    let shared_config = Arc::new(config.clone());
    let mut report = PipelineReport::new();

    for corpus_type in CorpusType::selected(config.dataset.as_deref()) {
        let marker = format!("{}.", corpus_type);
        let shards = list_files(raw_path, |name| {
            name.contains(&marker) && name.ends_with(".json") && !name.ends_with(".bert.json")
        })?;
        info!("{}: {} shards to convert", corpus_type, shards.len());

        let jobs: Vec<(PathBuf, PathBuf)> = shards
            .into_iter()
            .map(|f| {
                let save = save_dir.join(bert_file_name(&f));
                (f, save)
            })
            .collect();

        let tokenizer = Arc::clone(&tokenizer);
        let task_config = Arc::clone(&shared_config);
        let mut split = SplitReport::default();
        pool.run(
            jobs,
            move |(json_file, save_file): (PathBuf, PathBuf)| {
                format_shard_to_bert(
                    corpus_type,
                    &json_file,
                    &save_file,
                    tokenizer.as_ref(),
                    &task_config,
                )
                .map_err(|e| (json_file, e))
            },
            |result| {
                match result {
                    Ok(Some(shard)) => {
                        split.shards.extend(shard.shards);
                        split.records += shard.records;
                        split.skipped += shard.skipped;
                    }
                    Ok(None) => {}
                    Err((json_file, e)) if e.is_per_document() => {
                        error!("Skipping shard {}: {}", json_file.display(), e);
                    }
                    Err((_, e)) => return Err(e),
                }
                Ok(())
            },
        )?;
        split.shards.sort();
        info!(
            "{}: {} records written, {} documents dropped",
            corpus_type, split.records, split.skipped
        );
        report.insert(corpus_type, split);
    }
    Ok(report)
}
