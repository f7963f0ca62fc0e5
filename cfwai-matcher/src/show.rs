use cfwai_model::ShowMatch;

use crate::normalize::{normalize, tokenize};
use crate::token_ratio::token_set_ratio;

/// A show in the library catalog worth scoring against: its display title
/// and the id the library service uses to identify it.
#[derive(Debug, Clone)]
pub struct ShowCandidate {
    pub title: String,
    pub id: String,
}

/// Score `input` (the item's `"{creator} :: {title}"` composite) against
/// every candidate show and return the best match, per spec §4.2's show
/// match formula: verbatim-substring bonus + token-set similarity +
/// keyword overlap. Ties keep the first candidate encountered.
pub fn show_match(input: &str, candidates: &[ShowCandidate]) -> ShowMatch {
    if candidates.is_empty() {
        return ShowMatch::no_candidates(input);
    }

    let normalized_input = normalize(input);
    let input_tokens = tokenize(input);

    let mut best: Option<ShowMatch> = None;
    let mut best_score = i64::MIN;

    for candidate in candidates {
        let normalized_show = normalize(&candidate.title);
        let verbatim = !normalized_show.is_empty() && normalized_input.contains(&normalized_show);
        let verbatim_bonus = if verbatim {
            35 + candidate.title.chars().count() as i64
        } else {
            0
        };

        let show_tokens = tokenize(&candidate.title);
        let token_score = token_set_ratio(input, &candidate.title);
        let overlap = if show_tokens.is_empty() {
            0.0
        } else {
            show_tokens.intersection(&input_tokens).count() as f64 / show_tokens.len() as f64
        };

        let score = verbatim_bonus
            + (token_score * 0.10).round() as i64
            + (overlap * 50.0).round() as i64;

        let reason = format!(
            "{}token set similarity: {}%, keyword overlap: {}%",
            if verbatim { "verbatim match; " } else { "" },
            token_score.round() as i64,
            (overlap * 100.0).round() as i64,
        );

        if score > best_score {
            best_score = score;
            best = Some(ShowMatch {
                input: input.to_string(),
                matched_show: Some(candidate.title.clone()),
                matched_id: Some(candidate.id.clone()),
                score,
                reason,
            });
        }
    }

    best.expect("candidates is non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, id: &str) -> ShowCandidate {
        ShowCandidate { title: title.to_string(), id: id.to_string() }
    }

    #[test]
    fn verbatim_match_wins_decisively() {
        let candidates = vec![
            candidate("Jet Lag: The Game", "1"),
            candidate("Jet Set Radio", "2"),
        ];
        let result = show_match("Jet Lag: The Game :: Ep 2 — Hide And Seek", &candidates);
        assert_eq!(result.matched_id.as_deref(), Some("1"));
        assert!(result.score >= 80);
    }

    #[test]
    fn empty_candidates_yields_no_candidates_sentinel() {
        let result = show_match("Some Creator :: Some Title", &[]);
        assert_eq!(result.score, -1);
        assert_eq!(result.reason, "no candidates");
    }

    #[test]
    fn score_boundary_at_80_is_the_acceptance_threshold() {
        let candidates = vec![candidate("Jet Lag: The Game", "1")];
        let accepted = show_match("Jet Lag: The Game :: Something Else Entirely", &candidates);
        assert!(accepted.score >= 80);

        let rejected = show_match("Unrelated Creator :: Totally Different Title", &candidates);
        assert!(rejected.score < 80);
    }

    #[test]
    fn first_candidate_wins_ties() {
        let candidates = vec![candidate("Same Show", "first"), candidate("Same Show", "second")];
        let result = show_match("Creator :: Same Show", &candidates);
        assert_eq!(result.matched_id.as_deref(), Some("first"));
    }
}
