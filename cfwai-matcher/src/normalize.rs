use std::collections::BTreeSet;

/// Lowercase, collapse anything that isn't alphanumeric into a single
/// space, and trim. Mirrors `rapidfuzz.utils.default_process`, which both
/// `token_set_ratio` and the token-overlap scoring in the source rely on.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim().to_string()
}

/// Normalize then split on whitespace into a token set.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation() {
        assert_eq!(normalize("Jet Lag: The Game!!"), "jet lag the game");
    }

    #[test]
    fn tokenize_splits_on_whitespace() {
        let tokens = tokenize("We Played Hide-And-Seek");
        assert!(tokens.contains("hide"));
        assert!(tokens.contains("and"));
        assert!(tokens.contains("seek"));
    }
}
