use std::collections::HashMap;
use std::sync::LazyLock;

use cfwai_model::{EpisodeMatch, EpisodeRecord};
use regex::Regex;

use crate::date::date_distance_days;
use crate::normalize::{normalize, tokenize};
use crate::token_ratio::token_set_ratio;

const MONITORED_BONUS_THRESHOLD: i64 = 70;

/// Ordered season/episode extraction cascade. Earlier patterns are tried
/// first; `original_source/matcher.py::extract_episode_hint` tries them in
/// exactly this order so e.g. `"S2E3"` is never mistakenly read by the
/// bare `"Episode 3"` pattern.
static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)s(\d+)e(\d+)").unwrap(),
        Regex::new(r"(?i)season\D*(\d+)\D+episode\D*(\d+)").unwrap(),
        Regex::new(r"(?i)s(\d+)\D+ep(?:isode)?\D*(\d+)").unwrap(),
        Regex::new(r"(?i)episode\D*(\d+)").unwrap(),
        Regex::new(r"(?i)ep\D*(\d+)").unwrap(),
    ]
});

/// Returns `(season, episode)`, using `-1` for an unparsed field —
/// matching the source's sentinel rather than introducing an `Option`
/// pair that would lose the "episode-only" case's distinct shape.
fn extract_episode_hint(title: &str) -> (i64, i64) {
    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(title) {
            let groups: Vec<i64> = caps
                .iter()
                .skip(1)
                .flatten()
                .filter_map(|m| m.as_str().parse::<i64>().ok())
                .collect();
            if groups.len() == 2 {
                return (groups[0], groups[1]);
            } else if groups.len() == 1 {
                // The bare "Episode N" / "Ep N" patterns only capture episode.
                return (-1, groups[0]);
            }
        }
    }
    (-1, -1)
}

fn build_token_frequencies(candidates: &[EpisodeRecord]) -> HashMap<String, u32> {
    let mut freq = HashMap::new();
    for candidate in candidates {
        for token in tokenize(&candidate.title) {
            *freq.entry(token).or_insert(0) += 1;
        }
    }
    freq
}

fn weighted_overlap(
    input_tokens: &std::collections::BTreeSet<String>,
    candidate_tokens: &std::collections::BTreeSet<String>,
    freq: &HashMap<String, u32>,
) -> f64 {
    if candidate_tokens.is_empty() {
        return 0.0;
    }
    let mut total_weight = 0.0;
    let mut overlap_weight = 0.0;
    for token in candidate_tokens {
        let weight = 1.0 / *freq.get(token).unwrap_or(&1) as f64;
        total_weight += weight;
        if input_tokens.contains(token) {
            overlap_weight += weight;
        }
    }
    if total_weight > 0.0 {
        overlap_weight / total_weight
    } else {
        0.0
    }
}

struct Scored {
    score: i64,
    reason: String,
}

fn score_candidate(
    main_title: &str,
    season: i64,
    episode: i64,
    candidate: &EpisodeRecord,
    freq: &HashMap<String, u32>,
) -> Scored {
    let mut score: i64 = 0;
    let mut reasons = Vec::new();

    if season != -1 && episode != -1 {
        if candidate.season == season && candidate.episode == episode {
            score += 50;
            reasons.push("season/episode exact match".to_string());
        } else {
            reasons.push("season/episode mismatch".to_string());
        }
    }

    let input_tokens = tokenize(main_title);
    let candidate_tokens = tokenize(&candidate.title);

    let token_score = token_set_ratio(main_title, &candidate.title);
    let recall = weighted_overlap(&input_tokens, &candidate_tokens, freq);

    score += (token_score * 0.30) as i64;
    score += (recall * 70.0) as i64;

    let missed = input_tokens.difference(&candidate_tokens).count() as i64;
    let missed_penalty = missed * 5;
    score -= missed_penalty;
    reasons.push(format!("missed tokens: {missed} (-{missed_penalty})"));

    let extra = candidate_tokens.difference(&input_tokens).count() as i64;
    let extra_penalty = (extra as f64 * 2.5) as i64;
    score -= extra_penalty;
    reasons.push(format!("extra tokens: {extra} (-{extra_penalty})"));

    reasons.push(format!("token set similarity: {}%", token_score.round() as i64));
    reasons.push(format!("weighted keyword recall: {}%", (recall * 100.0).round() as i64));

    Scored { score, reason: reasons.join("; ") }
}

/// Score `input` + `airdate` against every episode in `candidates` and
/// return the best match, per spec §4.2's episode match formula. All
/// string fields are normalized (lowercase, alphanumeric-only) before
/// scoring; `candidates` is expected to already be the flattened episode
/// pool for the series under consideration (built by the caller from the
/// library adapter's `list_episodes`).
pub fn episode_match(input: &str, airdate: &str, candidates: &[EpisodeRecord]) -> EpisodeMatch {
    if candidates.is_empty() {
        return EpisodeMatch::no_candidates(input);
    }

    let cleaned_title = normalize(input);
    let freq = build_token_frequencies(candidates);
    let (season, episode) = extract_episode_hint(&cleaned_title);

    let mut best: Option<(EpisodeMatch, &EpisodeRecord)> = None;
    let mut best_score = i64::MIN;

    for candidate in candidates {
        let normalized_candidate = EpisodeRecord {
            title: normalize(&candidate.title),
            ..candidate.clone()
        };
        let scored = score_candidate(&cleaned_title, season, episode, &normalized_candidate, &freq);
        let mut score = scored.score;
        let mut reason = scored.reason;

        if let Some(episode_date) = candidate.air_date.as_deref().filter(|d| !d.is_empty()) {
            let gap = date_distance_days(airdate, episode_date);
            if gap >= 0 {
                let bonus = (50.0 - (gap as f64 * 25.0)).max(0.0);
                score += bonus as i64;
                reason.push_str(&format!("; date_gap={gap}d (bonus={bonus:.2})"));
            } else {
                reason.push_str("; no airdate match");
            }
        }

        if score > MONITORED_BONUS_THRESHOLD && candidate.monitored {
            score += 1;
        }

        if score > best_score {
            best_score = score;
            best = Some((
                EpisodeMatch {
                    input: input.to_string(),
                    matched_show: Some(candidate.series.clone()),
                    matched_series_id: Some(candidate.series_id.clone()),
                    season: Some(candidate.season),
                    episode: Some(candidate.episode),
                    episode_title: Some(candidate.title.clone()),
                    episode_orig_title: Some(candidate.title.clone()),
                    score,
                    reason,
                    full_match: Some(candidate.clone()),
                },
                candidate,
            ));
        }
    }

    best.expect("candidates is non-empty").0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(series_id: &str, season: i64, episode: i64, title: &str, air_date: Option<&str>, monitored: bool, has_file: bool) -> EpisodeRecord {
        EpisodeRecord {
            series: "Jet Lag: The Game".to_string(),
            series_id: series_id.to_string(),
            season,
            episode,
            title: title.to_string(),
            air_date: air_date.map(str::to_string),
            episode_id: 1,
            has_file,
            monitored,
        }
    }

    #[test]
    fn season_episode_hint_and_date_proximity_both_contribute() {
        let candidates = vec![episode("42", 9, 2, "We Played Hide And Seek Across NYC", Some("2025-04-26"), true, false)];
        let m = episode_match(
            "jet lag the game ep 2 we played hide and seek across nyc",
            "20250427",
            &candidates,
        );
        assert!(m.score >= 70, "expected score >= 70, got {}", m.score);
        assert_eq!(m.season, Some(9));
        assert_eq!(m.episode, Some(2));
    }

    #[test]
    fn empty_candidates_yields_no_candidates_sentinel() {
        let m = episode_match("anything", "20250101", &[]);
        assert_eq!(m.score, -1);
    }

    #[test]
    fn extract_hint_recognizes_all_cascade_forms() {
        assert_eq!(extract_episode_hint("s2e3"), (2, 3));
        assert_eq!(extract_episode_hint("season 2 episode 3"), (2, 3));
        assert_eq!(extract_episode_hint("s2 ep3"), (2, 3));
        assert_eq!(extract_episode_hint("episode 3"), (-1, 3));
        assert_eq!(extract_episode_hint("ep3"), (-1, 3));
        assert_eq!(extract_episode_hint("no hints here"), (-1, -1));
    }

    #[test]
    fn unmatched_episode_gets_no_monitored_bonus() {
        let candidates = vec![episode("1", 1, 1, "Totally Unrelated", None, true, false)];
        let m = episode_match("nothing like it at all zzz", "20250101", &candidates);
        assert!(m.score <= MONITORED_BONUS_THRESHOLD);
    }
}
