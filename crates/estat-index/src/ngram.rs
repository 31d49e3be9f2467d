//! Character n-grams over normalized metadata text

use unicode_normalization::UnicodeNormalization;

/// Window width used for every index artifact.
pub const WIDTH: usize = 2;

fn is_stripped(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '-' | ',' | '[' | ']' | '・')
}

/// NFKC, then drop whitespace, brackets, hyphens, commas and `・`.
///
/// Full-width punctuation folds to ASCII under NFKC, so `（` is stripped too.
pub fn normalize(text: &str) -> String {
    text.nfkc().filter(|&c| !is_stripped(c)).collect()
}

/// Sliding window of `width` characters over the normalized text.
pub fn ngrams(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = normalize(text).chars().collect();
    chars.windows(width).map(String::from_iter).collect()
}

/// One index line: the width-2 n-grams joined by commas.
pub fn ngram_line(text: &str) -> String {
    ngrams(text, WIDTH).join(",")
}
