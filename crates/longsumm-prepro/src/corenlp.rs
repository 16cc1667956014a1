//! Stanford CoreNLP tokenization of raw `*.story` files.
//!
//! CoreNLP runs as an external Java process; a failed run or a mismatched
//! output file count aborts the pipeline.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use longsumm_core::{Error, Result};

use crate::split::list_files;

const FILE_LIST: &str = "mapping_for_corenlp.txt";

/// How to launch CoreNLP.
#[derive(Debug, Clone)]
pub struct CoreNlpCommand {
    /// Executable, `java` by default.
    pub program: String,
    /// Arguments placed before the pipeline class (e.g. `-cp`, a classpath).
    pub java_args: Vec<String>,
}

impl Default for CoreNlpCommand {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            java_args: Vec::new(),
        }
    }
}

impl CoreNlpCommand {
    fn build(&self, file_list: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.java_args)
            .arg("edu.stanford.nlp.pipeline.StanfordCoreNLP")
            .args(["-annotators", "tokenize,ssplit"])
            .args(["-ssplit.newlineIsSentenceBreak", "always"])
            .arg("-filelist")
            .arg(file_list)
            .args(["-outputFormat", "json"])
            .arg("-outputDirectory")
            .arg(output_dir);
        cmd
    }
}

/// Tokenize every `*.story` in `stories_dir` into `output_dir` as JSON.
///
/// Returns the number of stories tokenized.
pub fn tokenize_stories(
    stories_dir: &Path,
    output_dir: &Path,
    command: &CoreNlpCommand,
) -> Result<usize> {
    let stories_dir = stories_dir.canonicalize()?;
    std::fs::create_dir_all(output_dir)?;
    let output_dir = output_dir.canonicalize()?;

    let stories: Vec<PathBuf> = list_files(&stories_dir, |name| name.ends_with("story"))?;
    info!(
        "Tokenizing {} files in {} and saving in {}",
        stories.len(),
        stories_dir.display(),
        output_dir.display()
    );

    let file_list = output_dir
        .parent()
        .map(|p| p.join(FILE_LIST))
        .unwrap_or_else(|| PathBuf::from(FILE_LIST));
    let listing: String = stories
        .iter()
        .map(|p| format!("{}\n", p.display()))
        .collect();
    std::fs::write(&file_list, listing)?;

    let status = command.build(&file_list, &output_dir).status();
    let _ = std::fs::remove_file(&file_list);
    let status = status.map_err(|e| {
        Error::ExternalTool(format!("failed to launch {}: {}", command.program, e))
    })?;
    if !status.success() {
        return Err(Error::ExternalTool(format!(
            "CoreNLP exited with {}",
            status
        )));
    }

    let tokenized = std::fs::read_dir(&output_dir)?.count();
    if tokenized != stories.len() {
        return Err(Error::ExternalTool(format!(
            "the tokenized stories directory {} contains {} files, but it should contain {} \
             (one per story in {}); was there an error during tokenization?",
            output_dir.display(),
            tokenized,
            stories.len(),
            stories_dir.display()
        )));
    }
    info!("Stanford CoreNLP tokenizer has finished");
    Ok(stories.len())
}
