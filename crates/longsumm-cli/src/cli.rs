//! Subcommands, one per preprocessing mode. Every [`PreprocessConfig`] field
//! can be set from a JSON file and overridden by a flag.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use longsumm_core::PreprocessConfig;
use longsumm_prepro::corenlp::{tokenize_stories, CoreNlpCommand};
use longsumm_prepro::{
    format_paper_to_lines, format_to_bert, format_to_lines, format_xsum_to_lines, BertTokenizer,
    PipelineReport, SubwordTokenizer,
};

#[derive(Parser, Debug)]
#[command(
    name = "longsumm",
    version,
    about = "Build extractive-summarization training data from raw corpora."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tokenize `*.story` files with Stanford CoreNLP.
    Tokenize {
        #[arg(long)]
        raw_path: PathBuf,
        #[arg(long)]
        save_path: PathBuf,
        /// Java executable.
        #[arg(long, default_value = "java")]
        java: String,
        /// Classpath holding the CoreNLP jars.
        #[arg(long)]
        classpath: Option<String>,
    },
    /// CoreNLP story JSON to line shards, split by mapping files.
    FormatToLines {
        #[arg(long)]
        raw_path: PathBuf,
        /// Shard prefix; shards are `<prefix>.<split>.<n>.json`.
        #[arg(long)]
        save_path: PathBuf,
        /// Directory with `mapping_{train,valid,test}.txt`.
        #[arg(long)]
        map_path: PathBuf,
        #[command(flatten)]
        prepro: PreproArgs,
    },
    /// XSum body/summary pairs to line shards.
    FormatXsumToLines {
        #[arg(long)]
        raw_path: PathBuf,
        #[arg(long)]
        save_path: PathBuf,
        #[command(flatten)]
        prepro: PreproArgs,
    },
    /// Paper/slide pairs to line shards in a directory.
    FormatPaperToLines {
        #[arg(long)]
        raw_path: PathBuf,
        #[arg(long)]
        save_path: PathBuf,
        #[command(flatten)]
        prepro: PreproArgs,
    },
    /// Line shards to labelled training records.
    FormatToBert {
        #[arg(long)]
        raw_path: PathBuf,
        #[arg(long)]
        save_path: PathBuf,
        /// WordPiece `vocab.txt` or a `tokenizer.json`.
        #[arg(long)]
        vocab: PathBuf,
        #[command(flatten)]
        prepro: PreproArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct PreproArgs {
    /// JSON file with preprocessing options.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub shard_size: Option<usize>,
    #[arg(long)]
    pub min_src_nsents: Option<usize>,
    #[arg(long)]
    pub max_src_nsents: Option<usize>,
    #[arg(long)]
    pub min_src_ntokens_per_sent: Option<usize>,
    #[arg(long)]
    pub max_src_ntokens_per_sent: Option<usize>,
    #[arg(long)]
    pub min_tgt_ntokens: Option<usize>,
    #[arg(long)]
    pub max_tgt_ntokens: Option<usize>,
    #[arg(long)]
    pub lower: Option<bool>,
    #[arg(long)]
    pub use_bert_basic_tokenizer: Option<bool>,
    #[arg(long)]
    pub n_cpus: Option<usize>,
    /// Only this split (`train`, `valid` or `test`).
    #[arg(long)]
    pub dataset: Option<String>,
    #[arg(long)]
    pub summary_ratio: Option<f64>,
}

impl PreproArgs {
    pub fn resolve(&self) -> Result<PreprocessConfig> {
        let mut config = match &self.config {
            Some(path) => PreprocessConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PreprocessConfig::default(),
        };
        if let Some(v) = self.shard_size {
            config.shard_size = v;
        }
        if let Some(v) = self.min_src_nsents {
            config.min_src_nsents = v;
        }
        if let Some(v) = self.max_src_nsents {
            config.max_src_nsents = v;
        }
        if let Some(v) = self.min_src_ntokens_per_sent {
            config.min_src_ntokens_per_sent = v;
        }
        if let Some(v) = self.max_src_ntokens_per_sent {
            config.max_src_ntokens_per_sent = v;
        }
        if let Some(v) = self.min_tgt_ntokens {
            config.min_tgt_ntokens = v;
        }
        if let Some(v) = self.max_tgt_ntokens {
            config.max_tgt_ntokens = v;
        }
        if let Some(v) = self.lower {
            config.lower = v;
        }
        if let Some(v) = self.use_bert_basic_tokenizer {
            config.use_bert_basic_tokenizer = v;
        }
        if let Some(v) = self.n_cpus {
            config.n_cpus = v;
        }
        if let Some(v) = self.summary_ratio {
            config.summary_ratio = v;
        }
        if self.dataset.is_some() {
            config.dataset = self.dataset.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Tokenize {
                raw_path,
                save_path,
                java,
                classpath,
            } => {
                let command = CoreNlpCommand {
                    program: java,
                    java_args: classpath
                        .map(|cp| vec!["-cp".to_string(), cp])
                        .unwrap_or_default(),
                };
                let n = tokenize_stories(&raw_path, &save_path, &command)?;
                info!("Tokenized {} stories", n);
                Ok(())
            }
            Command::FormatToLines {
                raw_path,
                save_path,
                map_path,
                prepro,
            } => {
                let config = prepro.resolve()?;
                print_report(format_to_lines(&raw_path, &save_path, &map_path, &config)?)
            }
            Command::FormatXsumToLines {
                raw_path,
                save_path,
                prepro,
            } => {
                let config = prepro.resolve()?;
                print_report(format_xsum_to_lines(&raw_path, &save_path, &config)?)
            }
            Command::FormatPaperToLines {
                raw_path,
                save_path,
                prepro,
            } => {
                let config = prepro.resolve()?;
                print_report(format_paper_to_lines(&raw_path, &save_path, &config)?)
            }
            Command::FormatToBert {
                raw_path,
                save_path,
                vocab,
                prepro,
            } => {
                let config = prepro.resolve()?;
                let tokenizer: Arc<dyn SubwordTokenizer> =
                    Arc::new(BertTokenizer::load(&vocab, config.lower)?);
                print_report(format_to_bert(&raw_path, &save_path, &config, tokenizer)?)
            }
        }
    }
}

fn print_report(report: PipelineReport) -> Result<()> {
    for (corpus_type, split) in &report {
        info!(
            "{}: {} records in {} shards, {} skipped",
            corpus_type,
            split.records,
            split.shards.len(),
            split.skipped
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prepro.json");
        std::fs::write(&path, r#"{"shard_size": 10, "min_src_nsents": 1}"#).unwrap();

        let cli = Cli::try_parse_from([
            "longsumm",
            "format-to-lines",
            "--raw-path",
            "raw",
            "--save-path",
            "out/cnndm",
            "--map-path",
            "maps",
            "--config",
            path.to_str().unwrap(),
            "--shard-size",
            "7",
            "--lower",
            "false",
            "--dataset",
            "test",
        ])
        .unwrap();

        let Command::FormatToLines { prepro, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        let config = prepro.resolve().unwrap();
        assert_eq!(config.shard_size, 7);
        assert_eq!(config.min_src_nsents, 1);
        assert!(!config.lower);
        assert_eq!(config.dataset.as_deref(), Some("test"));
        assert_eq!(config.max_src_nsents, PreprocessConfig::default().max_src_nsents);
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = PreproArgs::default().resolve().unwrap();
        assert_eq!(config, PreprocessConfig::default());
    }

    #[test]
    fn test_bert_mode_requires_vocab() {
        let err = Cli::try_parse_from([
            "longsumm",
            "format-to-bert",
            "--raw-path",
            "a",
            "--save-path",
            "b",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = PreproArgs {
            shard_size: Some(0),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }
}
