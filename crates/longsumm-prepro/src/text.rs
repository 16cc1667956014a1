//! Text normalization helpers shared by the readers, ROUGE labelling and
//! the basic tokenizer.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKET_ESCAPES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-lrb-|-rrb-|-lcb-|-rcb-|-lsb-|-rsb-|``|''").unwrap());

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9 ]").unwrap());

/// Undo CoreNLP/PTB bracket and quote escapes.
pub fn clean(text: &str) -> String {
    BRACKET_ESCAPES
        .replace_all(text, |caps: &regex::Captures| match &caps[0] {
            "-lrb-" => "(",
            "-rrb-" => ")",
            "-lcb-" => "{",
            "-rcb-" => "}",
            "-lsb-" => "[",
            "-rsb-" => "]",
            _ => "\"",
        })
        .into_owned()
}

/// Clean every sentence and re-split it on whitespace.
pub fn clean_sentences(sentences: Vec<Vec<String>>) -> Vec<Vec<String>> {
    sentences
        .into_iter()
        .map(|sent| {
            clean(&sent.join(" "))
                .split_whitespace()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Strip everything except ASCII letters, digits and spaces.
pub fn rouge_clean(text: &str) -> String {
    NON_ALNUM.replace_all(text, "").into_owned()
}

/// Lowercase every token of every sentence.
pub fn lowercase_sentences(sentences: &[Vec<String>]) -> Vec<Vec<String>> {
    sentences
        .iter()
        .map(|s| s.join(" ").to_lowercase().split_whitespace().map(str::to_string).collect())
        .collect()
}

/// Whitespace and punctuation splitting, optionally lowercased.
///
/// Bracketed special markers such as `[SEP]` or `[unused0]` are kept whole.
pub fn basic_tokenize(text: &str, lower: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        if is_special_marker(word) {
            tokens.push(word.to_string());
            continue;
        }
        let word = if lower { word.to_lowercase() } else { word.to_string() };
        let mut current = String::new();
        for c in word.chars() {
            if c.is_ascii_punctuation() {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

fn is_special_marker(word: &str) -> bool {
    word.len() > 2
        && word.starts_with('[')
        && word.ends_with(']')
        && word[1..word.len() - 1]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_escapes() {
        assert_eq!(clean("-lrb- cnn -rrb- said ``hi''"), "( cnn ) said \"hi\"");
        assert_eq!(clean("nothing here"), "nothing here");
    }

    #[test]
    fn test_clean_sentences_resplits() {
        let sents = vec![vec!["-lrb-".to_string(), "a".to_string(), "-rrb-".to_string()]];
        assert_eq!(clean_sentences(sents), vec![vec!["(", "a", ")"]]);
    }

    #[test]
    fn test_rouge_clean() {
        assert_eq!(rouge_clean("it's 3.5 km, ok?"), "its 35 km ok");
        assert_eq!(rouge_clean("über"), "ber");
    }

    #[test]
    fn test_basic_tokenize() {
        assert_eq!(
            basic_tokenize("Hello, World! [SEP] [unused2] x", true),
            vec!["hello", ",", "world", "!", "[SEP]", "[unused2]", "x"]
        );
        assert_eq!(basic_tokenize("A-B", false), vec!["A", "-", "B"]);
    }
}
