//! End-to-end preprocessing: CoreNLP stories → line shards → training records.

use std::path::Path;
use std::sync::Arc;

use longsumm_core::{CorpusType, PreprocessConfig, RawExample, TrainingRecord};
use longsumm_prepro::{format_to_bert, format_to_lines, hashhex, BertTokenizer, SubwordTokenizer};

const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[unused0]", "[unused1]", "[unused2]", "the", "cat",
    "sat", "on", "mat", "dog", "ran", "far", "away", "it", "was", "red", "and", "big", ".",
];

fn story(sentences: &[&str], highlights: &[&str]) -> serde_json::Value {
    let mut out = Vec::new();
    for (i, sent) in sentences.iter().enumerate() {
        let words: Vec<&str> = sent.split_whitespace().collect();
        let tokens: Vec<serde_json::Value> = words
            .iter()
            .enumerate()
            .map(|(j, w)| {
                // Every second sentence ends a paragraph.
                let after = if j + 1 == words.len() && i % 2 == 1 { "\n" } else { " " };
                serde_json::json!({ "word": w, "after": after })
            })
            .collect();
        out.push(serde_json::json!({ "tokens": tokens }));
    }
    for h in highlights {
        out.push(serde_json::json!({ "tokens": [{ "word": "@highlight", "after": "\n" }] }));
        let tokens: Vec<serde_json::Value> = h
            .split_whitespace()
            .map(|w| serde_json::json!({ "word": w, "after": " " }))
            .collect();
        out.push(serde_json::json!({ "tokens": tokens }));
    }
    serde_json::json!({ "sentences": out })
}

fn write_corpus(root: &Path) {
    let raw = root.join("raw");
    let maps = root.join("maps");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::create_dir_all(&maps).unwrap();

    let sentences = [
        "The cat sat on the mat .",
        "It was red and big .",
        "The dog ran far away .",
        "The mat was big .",
        "It ran and sat .",
    ];
    let ids = ["story-1", "story-2", "story-3", "story-4"];
    for id in ids {
        let doc = story(&sentences, &["the cat sat on the red mat"]);
        std::fs::write(raw.join(format!("{}.story.json", hashhex(id))), doc.to_string()).unwrap();
    }
    // Malformed document in the training split.
    std::fs::write(raw.join(format!("{}.story.json", hashhex("broken"))), "{").unwrap();

    std::fs::write(maps.join("mapping_train.txt"), "story-1\nstory-2\nbroken\n").unwrap();
    std::fs::write(maps.join("mapping_valid.txt"), "story-3\n").unwrap();
    std::fs::write(maps.join("mapping_test.txt"), "story-4\n").unwrap();
}

fn config() -> PreprocessConfig {
    PreprocessConfig {
        shard_size: 1,
        n_cpus: 2,
        min_src_nsents: 2,
        min_src_ntokens_per_sent: 3,
        min_tgt_ntokens: 3,
        ..Default::default()
    }
}

#[test]
fn test_lines_then_bert() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let cfg = config();

    let lines_prefix = dir.path().join("lines").join("cnndm");
    std::fs::create_dir_all(lines_prefix.parent().unwrap()).unwrap();
    let report = format_to_lines(
        &dir.path().join("raw"),
        &lines_prefix,
        &dir.path().join("maps"),
        &cfg,
    )
    .unwrap();

    let train = &report[&CorpusType::Train];
    assert_eq!(train.records, 2);
    assert_eq!(train.skipped, 1);
    assert_eq!(train.shards.len(), 2);
    assert_eq!(report[&CorpusType::Valid].records, 1);
    assert_eq!(report[&CorpusType::Test].records, 1);

    let shard: Vec<RawExample> =
        serde_json::from_str(&std::fs::read_to_string(&train.shards[0]).unwrap()).unwrap();
    assert_eq!(shard.len(), 1);
    assert_eq!(shard[0].src.len(), 5);
    assert_eq!(shard[0].sections, vec![0, 0, 1, 1, 2]);
    assert_eq!(shard[0].tgt.len(), 1);

    let tokenizer: Arc<dyn SubwordTokenizer> =
        Arc::new(BertTokenizer::from_tokens(VOCAB, true).unwrap());
    let bert_dir = dir.path().join("bert");
    let report = format_to_bert(&dir.path().join("lines"), &bert_dir, &cfg, tokenizer.clone()).unwrap();

    let train = &report[&CorpusType::Train];
    assert_eq!(train.shards.len(), 2);
    assert_eq!(train.records, 2);

    for split in report.values() {
        for path in &split.shards {
            let records: Vec<TrainingRecord> =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            for record in records {
                assert_eq!(record.sections.len(), record.src_sent_labels.len());
                assert_eq!(record.src_sent_labels.len(), record.clss.len());
                assert_eq!(record.token_sections.len(), record.segs.len());
                assert_eq!(record.segs.len(), record.src.len());
                assert!(record.src_sent_labels.iter().any(|&l| l == 1));
                assert!(record.tgt_txt.contains("cat sat"));
            }
        }
    }

    // Second run finds every output in place and writes nothing new.
    let again = format_to_bert(&dir.path().join("lines"), &bert_dir, &cfg, tokenizer).unwrap();
    assert!(again.values().all(|s| s.shards.is_empty()));
}

#[test]
fn test_dataset_filter() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let cfg = PreprocessConfig {
        dataset: Some("valid".into()),
        ..config()
    };
    let report = format_to_lines(
        &dir.path().join("raw"),
        &dir.path().join("cnndm"),
        &dir.path().join("maps"),
        &cfg,
    )
    .unwrap();
    assert_eq!(report.len(), 1);
    assert!(report.contains_key(&CorpusType::Valid));
}
