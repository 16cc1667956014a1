//! Set-based ROUGE-N precision, recall and F1.

use std::collections::HashSet;

/// An n-gram as its token sequence.
pub type Ngram = Vec<String>;

/// F1 denominator guard for `P = R = 0`.
const F1_EPSILON: f64 = 1e-8;

/// Precision, recall and F1 of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RougeScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Distinct word n-grams of the concatenation of `sentences`.
pub fn word_ngrams<S: AsRef<str>>(n: usize, sentences: &[Vec<S>]) -> HashSet<Ngram> {
    let words: Vec<String> = sentences
        .iter()
        .flat_map(|s| s.iter().map(|w| w.as_ref().to_string()))
        .collect();
    ngrams(n, &words)
}

/// Distinct n-grams of a single token sequence.
pub fn ngrams(n: usize, words: &[String]) -> HashSet<Ngram> {
    if n == 0 || words.len() < n {
        return HashSet::new();
    }
    words.windows(n).map(|w| w.to_vec()).collect()
}

/// Compare an evaluated n-gram set against a reference set.
///
/// Precision is 0 for an empty evaluated set and recall is 0 for an empty
/// reference set; F1 never divides by zero.
pub fn cal_rouge(evaluated: &HashSet<Ngram>, reference: &HashSet<Ngram>) -> RougeScore {
    let overlap = evaluated.intersection(reference).count() as f64;

    let precision = if evaluated.is_empty() {
        0.0
    } else {
        overlap / evaluated.len() as f64
    };
    let recall = if reference.is_empty() {
        0.0
    } else {
        overlap / reference.len() as f64
    };
    let f1 = 2.0 * ((precision * recall) / (precision + recall + F1_EPSILON));

    RougeScore {
        precision,
        recall,
        f1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(n: usize, text: &str) -> HashSet<Ngram> {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        ngrams(n, &words)
    }

    #[test]
    fn test_ngrams_distinct() {
        let grams = set(2, "a b a b");
        // (a b), (b a)
        assert_eq!(grams.len(), 2);
        assert!(set(3, "a b").is_empty());
    }

    #[test]
    fn test_word_ngrams_spans_sentences() {
        let sents = vec![vec!["a", "b"], vec!["c"]];
        let grams = word_ngrams(2, &sents);
        assert!(grams.contains(&vec!["b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_cal_rouge_partial_overlap() {
        let score = cal_rouge(&set(1, "a b c d"), &set(1, "a b"));
        assert!((score.precision - 0.5).abs() < 1e-12);
        assert!((score.recall - 1.0).abs() < 1e-12);
        assert!((score.f1 - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_cal_rouge_empty_sets() {
        let empty = HashSet::new();
        let score = cal_rouge(&empty, &empty);
        assert_eq!(score.precision, 0.0);
        assert_eq!(score.recall, 0.0);
        assert_eq!(score.f1, 0.0);

        let score = cal_rouge(&set(1, "a"), &empty);
        assert_eq!(score.f1, 0.0);
    }

    #[test]
    fn test_cal_rouge_f1_bounded() {
        let cases = [
            ("a b c", "a b c"),
            ("a", "b"),
            ("a b c d e", "e"),
            ("x y", "x y z w"),
        ];
        for (eval, reference) in cases {
            for n in 1..=2 {
                let f1 = cal_rouge(&set(n, eval), &set(n, reference)).f1;
                assert!((0.0..=1.0).contains(&f1), "f1 {} out of range", f1);
            }
        }
    }
}
