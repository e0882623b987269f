//! Candidate-ranking strategies for "what should a human annotate next".
//! Pure functions over plain structs; the caller fetches unannotated
//! items plus their enrichment data and passes them in.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActiveLearningStrategy {
    Uncertainty,
    Diversity,
    Entropy,
    Random,
}

/// One dataset item plus the enrichment fields ranking draws on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub item_id: String,
    pub media_id: String,
    pub auto_tags: Vec<String>,
    pub auto_caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub item_id: String,
    pub media_id: String,
    pub score: f64,
    pub reason: &'static str,
}

/// Dispatches to the named strategy and returns the top `limit` suggestions,
/// ranked descending by score. `random` uses the caller-supplied `shuffle_seed`
/// in place of a nondeterministic shuffle so results are reproducible.
pub fn suggest(strategy: ActiveLearningStrategy, candidates: &[Candidate], limit: usize, shuffle_seed: u64) -> Vec<Suggestion> {
    let mut scored = match strategy {
        ActiveLearningStrategy::Uncertainty => rank_by_uncertainty(candidates),
        ActiveLearningStrategy::Diversity => rank_by_diversity(candidates),
        ActiveLearningStrategy::Entropy => rank_by_entropy(candidates),
        ActiveLearningStrategy::Random => rank_by_random(candidates, shuffle_seed),
    };
    scored.truncate(limit);
    scored
}

/// `1 / (|auto_tags| + 1)` if tags exist, else maximum uncertainty (1.0).
fn rank_by_uncertainty(candidates: &[Candidate]) -> Vec<Suggestion> {
    let mut scored: Vec<Suggestion> = candidates
        .iter()
        .map(|c| {
            let score = if c.auto_tags.is_empty() {
                1.0
            } else {
                1.0 / (c.auto_tags.len() as f64 + 1.0)
            };
            Suggestion { item_id: c.item_id.clone(), media_id: c.media_id.clone(), score, reason: "high_uncertainty" }
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored
}

/// Streaming novelty against a running `seen_tags` set, in candidate order.
fn rank_by_diversity(candidates: &[Candidate]) -> Vec<Suggestion> {
    let mut seen_tags: HashSet<&str> = HashSet::new();
    let mut scored: Vec<Suggestion> = candidates
        .iter()
        .map(|c| {
            let cand_tags: HashSet<&str> = c.auto_tags.iter().map(String::as_str).collect();
            let overlap = cand_tags.intersection(&seen_tags).count();
            let novelty = 1.0 - (overlap as f64 / cand_tags.len().max(1) as f64);
            seen_tags.extend(cand_tags);
            Suggestion { item_id: c.item_id.clone(), media_id: c.media_id.clone(), score: novelty, reason: "high_diversity" }
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored
}

/// `log(n)` for `n > 1` tags; 0.5 with a caption but no tags; 1.0 otherwise.
fn rank_by_entropy(candidates: &[Candidate]) -> Vec<Suggestion> {
    let mut scored: Vec<Suggestion> = candidates
        .iter()
        .map(|c| {
            let n = c.auto_tags.len();
            let score = if n > 1 {
                (n as f64).ln()
            } else if c.auto_caption.is_some() {
                0.5
            } else {
                1.0
            };
            Suggestion { item_id: c.item_id.clone(), media_id: c.media_id.clone(), score, reason: "high_entropy" }
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored
}

/// Deterministic shuffle keyed on `shuffle_seed`, standing in for the
/// Python endpoint's `random.shuffle` fallback.
fn rank_by_random(candidates: &[Candidate], shuffle_seed: u64) -> Vec<Suggestion> {
    let mut indexed: Vec<(u64, &Candidate)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (splitmix64(shuffle_seed ^ i as u64), c))
        .collect();
    indexed.sort_by_key(|(key, _)| *key);
    indexed
        .into_iter()
        .map(|(_, c)| Suggestion { item_id: c.item_id.clone(), media_id: c.media_id.clone(), score: 0.5, reason: "random" })
        .collect()
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveLearningStats {
    pub total_items: i64,
    pub annotated_items: i64,
    pub unannotated_items: i64,
    pub auto_annotations: i64,
    pub manual_annotations: i64,
    pub completion_pct: f64,
}

pub fn compute_stats(total_items: i64, annotated_items: i64, auto_annotations: i64, manual_annotations: i64) -> ActiveLearningStats {
    let completion_pct = if total_items > 0 {
        (annotated_items as f64 / total_items as f64 * 100.0 * 10.0).round() / 10.0
    } else {
        0.0
    };
    ActiveLearningStats {
        total_items,
        annotated_items,
        unannotated_items: total_items - annotated_items,
        auto_annotations,
        manual_annotations,
        completion_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, tags: &[&str], caption: Option<&str>) -> Candidate {
        Candidate {
            item_id: id.to_string(),
            media_id: format!("media-{id}"),
            auto_tags: tags.iter().map(|t| t.to_string()).collect(),
            auto_caption: caption.map(str::to_string),
        }
    }

    #[test]
    fn uncertainty_ranks_fewer_tags_higher() {
        let candidates = vec![candidate("a", &["cat", "dog", "pet"], None), candidate("b", &[], None)];
        let ranked = suggest(ActiveLearningStrategy::Uncertainty, &candidates, 10, 0);
        assert_eq!(ranked[0].item_id, "b");
        assert_eq!(ranked[0].score, 1.0);
    }

    #[test]
    fn diversity_penalizes_repeated_tags() {
        let candidates = vec![candidate("a", &["cat"], None), candidate("b", &["cat"], None), candidate("c", &["dog"], None)];
        let ranked = suggest(ActiveLearningStrategy::Diversity, &candidates, 10, 0);
        let first_score = ranked.iter().find(|s| s.item_id == "a").unwrap().score;
        let second_score = ranked.iter().find(|s| s.item_id == "b").unwrap().score;
        assert_eq!(first_score, 1.0);
        assert_eq!(second_score, 0.0);
    }

    #[test]
    fn entropy_uses_caption_fallback() {
        let candidates = vec![
            candidate("a", &["cat", "dog"], None),
            candidate("b", &[], Some("a photo of a cat")),
            candidate("c", &[], None),
        ];
        let ranked = suggest(ActiveLearningStrategy::Entropy, &candidates, 10, 0);
        let score_of = |id: &str| ranked.iter().find(|s| s.item_id == id).unwrap().score;
        assert!((score_of("a") - 2f64.ln()).abs() < 1e-9);
        assert_eq!(score_of("b"), 0.5);
        assert_eq!(score_of("c"), 1.0);
    }

    #[test]
    fn random_strategy_is_deterministic_for_a_fixed_seed() {
        let candidates = vec![candidate("a", &[], None), candidate("b", &[], None), candidate("c", &[], None)];
        let first = suggest(ActiveLearningStrategy::Random, &candidates, 10, 42);
        let second = suggest(ActiveLearningStrategy::Random, &candidates, 10, 42);
        assert_eq!(first.iter().map(|s| s.item_id.clone()).collect::<Vec<_>>(), second.iter().map(|s| s.item_id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn stats_compute_completion_percentage() {
        let stats = compute_stats(10, 4, 2, 2);
        assert_eq!(stats.unannotated_items, 6);
        assert_eq!(stats.completion_pct, 40.0);
    }

    #[test]
    fn stats_on_empty_dataset_is_zero_pct() {
        let stats = compute_stats(0, 0, 0, 0);
        assert_eq!(stats.completion_pct, 0.0);
    }
}
