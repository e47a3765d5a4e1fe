//! Term tokenizer shared by vocabulary fitting and vectorization.
//!
//! Both sides of the pipeline must see identical terms, so this is the
//! only place text is normalized.
//!
//! # Rules
//!
//! 1. Lower-case the input.
//! 2. Replace every character outside `[a-z0-9]` and whitespace with a space.
//! 3. Split on whitespace runs.
//! 4. Drop tokens shorter than [`MIN_TOKEN_LEN`] and [`STOP_WORDS`].
//!
//! ```rust
//! use recall_core::tokenize::tokenize;
//!
//! assert_eq!(tokenize("The cat sat on the mat!"), vec!["cat", "sat", "mat"]);
//! ```

/// Minimum token length in bytes (all surviving chars are ASCII).
pub const MIN_TOKEN_LEN: usize = 2;

/// Common English words that carry no retrieval signal.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "this", "but", "they", "have",
    "had", "what", "when", "where", "who", "which", "why", "how",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Split `text` into index terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sentence() {
        assert_eq!(
            tokenize("The dog ran in the park"),
            vec!["dog", "ran", "park"]
        );
    }

    #[test]
    fn test_punctuation_splits_words() {
        assert_eq!(
            tokenize("state-of-the-art, e-mail: user@example.com"),
            vec!["state", "art", "mail", "user", "example", "com"]
        );
    }

    #[test]
    fn test_short_tokens_dropped() {
        assert_eq!(tokenize("x y z 42 ok"), vec!["42", "ok"]);
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(tokenize("café naïve über"), vec!["caf", "na", "ve", "ber"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \n\t  ").is_empty());
        assert!(tokenize("!!! ??? ...").is_empty());
    }

    #[test]
    fn test_output_shape_invariant() {
        let inputs = [
            "Hello, World! This is A Test.",
            "ÀÉÎ 123 ab_cd ÉTÉ\r\nline two",
            "THE AND WHICH how WHY",
            "┌──┐ │ok│ └──┘",
        ];
        for input in inputs {
            for token in tokenize(input) {
                assert!(token.len() >= MIN_TOKEN_LEN, "too short: {}", token);
                assert!(
                    token
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
                    "bad char in {}",
                    token
                );
                assert!(!is_stop_word(&token), "stop word leaked: {}", token);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Repeatable tokenization of the same string";
        assert_eq!(tokenize(text), tokenize(text));
    }
}
