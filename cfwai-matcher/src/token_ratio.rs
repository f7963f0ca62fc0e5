use crate::normalize::{normalize, tokenize};

/// Indel-distance-based similarity ratio on two already-normalized strings,
/// scaled 0-100. This is the same construction `rapidfuzz.fuzz.ratio` uses
/// (insertions/deletions only, via the longest common subsequence), which
/// the source depends on transitively through `token_set_ratio`.
fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    let lcs = longest_common_subsequence(&a, &b);
    200.0 * lcs as f64 / (a.len() + b.len()) as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ai in a {
        for (j, bj) in b.iter().enumerate() {
            curr[j + 1] = if ai == bj {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `rapidfuzz.fuzz.token_set_ratio` equivalent: tokenize both strings,
/// split into the shared-token string and each side's unique-token string,
/// and take the best of the three pairwise comparisons. Order-independent
/// and robust to one title containing extra words the other lacks.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 100.0;
    }

    let intersection: Vec<&String> = tokens_a.intersection(&tokens_b).collect();
    let only_a: Vec<&String> = tokens_a.difference(&tokens_b).collect();
    let only_b: Vec<&String> = tokens_b.difference(&tokens_a).collect();

    let join = |tokens: &[&String]| {
        tokens
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let intersect_str = join(&intersection);
    let diff_a = join(&only_a);
    let diff_b = join(&only_b);

    let combine = |base: &str, diff: &str| -> String {
        match (base.is_empty(), diff.is_empty()) {
            (true, true) => String::new(),
            (true, false) => diff.to_string(),
            (false, true) => base.to_string(),
            (false, false) => format!("{base} {diff}"),
        }
    };

    let combined_a = combine(&intersect_str, &diff_a);
    let combined_b = combine(&intersect_str, &diff_b);

    let r1 = ratio(&intersect_str, &combined_a);
    let r2 = ratio(&intersect_str, &combined_b);
    let r3 = ratio(&combined_a, &combined_b);

    r1.max(r2).max(r3)
}

/// Normalize-then-ratio, used where the source calls `fuzz.ratio` directly
/// rather than `token_set_ratio`.
#[allow(dead_code)]
pub fn simple_ratio(a: &str, b: &str) -> f64 {
    ratio(&normalize(a), &normalize(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(token_set_ratio("Jet Lag: The Game", "Jet Lag: The Game"), 100.0);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(token_set_ratio("Jet Lag: The Game", "Completely Different Show") < 40.0);
    }

    #[test]
    fn extra_words_do_not_tank_the_score() {
        let a = "Jet Lag: The Game";
        let b = "Jet Lag: The Game - We Played Hide And Seek Across NYC";
        assert!(token_set_ratio(a, b) > 80.0);
    }
}
