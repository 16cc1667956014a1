//! Greedy ROUGE oracle: labels the sentences an extractive model should pick.
//!
//! Each round adds the sentence that most improves ROUGE-1 F1 + ROUGE-2 F1 of
//! the selected set against the reference. Selection stops after
//! `summary_size` rounds or as soon as no remaining sentence strictly
//! improves the score, so fewer than `summary_size` sentences may come back.

use std::collections::HashSet;

use crate::rouge::{cal_rouge, ngrams, Ngram};
use crate::text::rouge_clean;

/// Outcome of a greedy selection run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GreedySelection {
    /// Chosen sentence indices, ascending.
    pub selected: Vec<usize>,
    /// Best combined score after each committed round.
    pub round_scores: Vec<f64>,
}

impl GreedySelection {
    /// Combined ROUGE-1 + ROUGE-2 F1 of the final selection.
    pub fn score(&self) -> f64 {
        self.round_scores.last().copied().unwrap_or(0.0)
    }
}

/// Select up to `summary_size` sentence indices of `doc` against `reference`.
pub fn greedy_selection<S: AsRef<str>>(
    doc: &[Vec<S>],
    reference: &[Vec<S>],
    summary_size: usize,
) -> Vec<usize> {
    greedy_selection_trace(doc, reference, summary_size).selected
}

/// Like [`greedy_selection`], also reporting the score after every round.
pub fn greedy_selection_trace<S: AsRef<str>>(
    doc: &[Vec<S>],
    reference: &[Vec<S>],
    summary_size: usize,
) -> GreedySelection {
    let abstract_words = normalize(&join_all(reference));
    let sents: Vec<Vec<String>> = doc.iter().map(|s| normalize(&join(s))).collect();

    let reference_1grams = ngrams(1, &abstract_words);
    let reference_2grams = ngrams(2, &abstract_words);
    let evaluated_1grams: Vec<HashSet<Ngram>> = sents.iter().map(|s| ngrams(1, s)).collect();
    let evaluated_2grams: Vec<HashSet<Ngram>> = sents.iter().map(|s| ngrams(2, s)).collect();

    let mut max_rouge = 0.0f64;
    let mut selection = GreedySelection::default();

    for _ in 0..summary_size {
        let mut cur_max_rouge = max_rouge;
        let mut cur_id = None;

        for i in 0..sents.len() {
            if selection.selected.contains(&i) {
                continue;
            }
            let candidate = || selection.selected.iter().copied().chain(std::iter::once(i));
            let candidates_1 = union(candidate().map(|idx| &evaluated_1grams[idx]));
            let candidates_2 = union(candidate().map(|idx| &evaluated_2grams[idx]));

            let rouge_1 = cal_rouge(&candidates_1, &reference_1grams).f1;
            let rouge_2 = cal_rouge(&candidates_2, &reference_2grams).f1;
            let rouge_score = rouge_1 + rouge_2;
            if rouge_score > cur_max_rouge {
                cur_max_rouge = rouge_score;
                cur_id = Some(i);
            }
        }

        match cur_id {
            Some(id) => {
                selection.selected.push(id);
                selection.round_scores.push(cur_max_rouge);
                max_rouge = cur_max_rouge;
            }
            None => break,
        }
    }

    selection.selected.sort_unstable();
    selection
}

fn union<'a>(sets: impl Iterator<Item = &'a HashSet<Ngram>>) -> HashSet<Ngram> {
    let mut out = HashSet::new();
    for set in sets {
        out.extend(set.iter().cloned());
    }
    out
}

fn join<S: AsRef<str>>(sentence: &[S]) -> String {
    sentence.iter().map(|w| w.as_ref()).collect::<Vec<_>>().join(" ")
}

fn join_all<S: AsRef<str>>(sentences: &[Vec<S>]) -> String {
    sentences.iter().map(|s| join(s)).collect::<Vec<_>>().join(" ")
}

fn normalize(text: &str) -> Vec<String> {
    rouge_clean(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(sents: &[&str]) -> Vec<Vec<String>> {
        sents
            .iter()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_picks_highest_overlap_sentence() {
        let src = doc(&["a b", "c d", "e"]);
        let reference = doc(&["a b e"]);
        assert_eq!(greedy_selection(&src, &reference, 1), vec![0]);
    }

    #[test]
    fn test_second_round_adds_complement() {
        let src = doc(&["a b", "c d", "e"]);
        let reference = doc(&["a b e"]);
        assert_eq!(greedy_selection(&src, &reference, 2), vec![0, 2]);
    }

    #[test]
    fn test_early_termination_when_nothing_improves() {
        let src = doc(&["a b", "c d", "e"]);
        let reference = doc(&["a b e"]);
        let trace = greedy_selection_trace(&src, &reference, 3);
        // Adding "c d" would lower precision, so round three stops.
        assert_eq!(trace.selected, vec![0, 2]);
        assert_eq!(trace.round_scores.len(), 2);
    }

    #[test]
    fn test_round_scores_strictly_increase() {
        let src = doc(&[
            "the cat sat on the mat",
            "dogs bark loudly at night",
            "the mat was red",
            "cats like warm places",
            "nothing relevant here at all",
        ]);
        let reference = doc(&["the cat sat on the red mat", "cats like warm mats"]);
        let trace = greedy_selection_trace(&src, &reference, 4);

        assert!(trace.selected.len() <= 4);
        for pair in trace.round_scores.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        for pair in trace.selected.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(trace.selected.iter().all(|&i| i < src.len()));
        assert!(trace.score() > 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        let empty: Vec<Vec<String>> = Vec::new();
        let reference = doc(&["a b"]);
        assert!(greedy_selection(&empty, &reference, 3).is_empty());

        let src = doc(&["a b", "c"]);
        assert!(greedy_selection(&src, &empty, 3).is_empty());
        assert!(greedy_selection(&src, &reference, 0).is_empty());
    }

    #[test]
    fn test_punctuation_ignored() {
        let src = doc(&["hello , world !", "bye"]);
        let reference = doc(&["hello world"]);
        assert_eq!(greedy_selection(&src, &reference, 1), vec![0]);
    }
}
