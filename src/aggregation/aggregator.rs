//! Majority-vote aggregation over proposer samples.
//!
//! Two policies are provided:
//! - Flat: every candidate votes in one pool.
//! - Windowed: candidates are ordered by sample index and tallied in
//!   contiguous windows whose counts are summed into one decision.
//!
//! Both select the answer with the most votes. Ties go to the answer whose
//! earliest supporter has the smallest `sample_index`, then to the
//! lexicographically smallest answer.

use crate::aggregation::AggregationError;
use crate::models::{AggregationResult, Candidate, WindowTally};
use std::collections::BTreeMap;
use tracing::debug;

/// Normalized answer used for vote grouping (whitespace-trimmed, case kept).
pub fn extract_final_answer(candidate: &Candidate) -> &str {
    candidate.final_answer.trim()
}

/// Vote counts plus the earliest sample index that voted for each answer.
#[derive(Debug, Default)]
struct VoteTally {
    counts: BTreeMap<String, usize>,
    earliest: BTreeMap<String, usize>,
}

impl VoteTally {
    fn from_candidates<'a>(candidates: impl IntoIterator<Item = &'a Candidate>) -> Self {
        let mut tally = Self::default();
        for candidate in candidates {
            tally.record(extract_final_answer(candidate), candidate.sample_index);
        }
        tally
    }

    fn record(&mut self, answer: &str, sample_index: usize) {
        *self.counts.entry(answer.to_string()).or_default() += 1;
        self.note_earliest(answer.to_string(), sample_index);
    }

    fn merge(&mut self, other: VoteTally) {
        for (answer, count) in other.counts {
            *self.counts.entry(answer).or_default() += count;
        }
        for (answer, sample_index) in other.earliest {
            self.note_earliest(answer, sample_index);
        }
    }

    fn note_earliest(&mut self, answer: String, sample_index: usize) {
        self.earliest
            .entry(answer)
            .and_modify(|earliest| *earliest = (*earliest).min(sample_index))
            .or_insert(sample_index);
    }

    /// Answers in descending vote order, ties broken deterministically.
    fn ranked(&self) -> Vec<(&str, usize)> {
        rank_votes(&self.counts, &self.earliest)
    }
}

/// Order answers by descending count, then by the earliest sample index that
/// voted for them, then lexicographically. Answers missing from `earliest`
/// sort after those present.
pub fn rank_votes<'a>(
    counts: &'a BTreeMap<String, usize>,
    earliest: &BTreeMap<String, usize>,
) -> Vec<(&'a str, usize)> {
    let earliest_of = |answer: &str| earliest.get(answer).copied().unwrap_or(usize::MAX);

    let mut ranked: Vec<(&str, usize)> = counts
        .iter()
        .map(|(answer, count)| (answer.as_str(), *count))
        .collect();

    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| earliest_of(a.0).cmp(&earliest_of(b.0)))
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
}

/// Aggregate all candidates as a single pool.
///
/// Fails with [`AggregationError::EmptyInput`] when `candidates` is empty.
/// All candidates are expected to share one prompt; the first one's
/// `prompt_id` is reported.
pub fn aggregate_flat(
    candidates: &[Candidate],
    strategy_name: &str,
) -> Result<AggregationResult, AggregationError> {
    let first = candidates.first().ok_or_else(|| AggregationError::EmptyInput {
        strategy: strategy_name.to_string(),
    })?;

    let tally = VoteTally::from_candidates(candidates);
    conclude(
        &first.prompt_id,
        strategy_name,
        tally,
        candidates.iter(),
        Vec::new(),
        None,
    )
}

/// Aggregate candidates window by window in sample order.
///
/// Candidates are stably sorted by `sample_index` and split into consecutive
/// windows of `window_size` (the last one may be shorter). The summed
/// window counts always equal the flat tally, so the winner matches
/// [`aggregate_flat`]; windows only show up in the rationale and in
/// [`AggregationResult::window_tallies`].
pub fn aggregate_windowed(
    candidates: &[Candidate],
    window_size: usize,
    strategy_name: &str,
) -> Result<AggregationResult, AggregationError> {
    let first = candidates.first().ok_or_else(|| AggregationError::EmptyInput {
        strategy: strategy_name.to_string(),
    })?;
    if window_size == 0 {
        return Err(AggregationError::InvalidWindowSize(window_size));
    }

    let mut order: Vec<&Candidate> = candidates.iter().collect();
    order.sort_by_key(|c| c.sample_index);

    let mut tally = VoteTally::default();
    let mut window_tallies = Vec::new();

    for (index, window) in order.chunks(window_size).enumerate() {
        let local = VoteTally::from_candidates(window.iter().copied());
        let first_sample = window.first().map(|c| c.sample_index).unwrap_or_default();
        let last_sample = window.last().map(|c| c.sample_index).unwrap_or_default();

        debug!(
            "Window {} (samples {}-{}): {:?}",
            index, first_sample, last_sample, local.counts
        );

        window_tallies.push(WindowTally {
            index,
            first_sample,
            last_sample,
            votes: local.counts.clone(),
            earliest: local.earliest.clone(),
        });
        tally.merge(local);
    }

    conclude(
        &first.prompt_id,
        strategy_name,
        tally,
        order.into_iter(),
        window_tallies,
        Some(window_size),
    )
}

/// Pick the winner, collect its supporters and build the result.
fn conclude<'a>(
    prompt_id: &str,
    strategy_name: &str,
    tally: VoteTally,
    pool: impl Iterator<Item = &'a Candidate>,
    window_tallies: Vec<WindowTally>,
    window_size: Option<usize>,
) -> Result<AggregationResult, AggregationError> {
    let ranked = tally.ranked();
    let (best_answer, best_count) =
        ranked
            .first()
            .copied()
            .ok_or_else(|| AggregationError::EmptyInput {
                strategy: strategy_name.to_string(),
            })?;

    let supporting = supporting_candidates(pool, best_answer);

    debug!(
        "{} picked '{}' with {} of {} votes for {}",
        strategy_name,
        best_answer,
        best_count,
        tally.counts.values().sum::<usize>(),
        prompt_id
    );

    let windows = window_size.map(|size| (window_tallies.len(), size));
    let rationale = build_rationale(strategy_name, best_answer, &ranked, &supporting, windows);
    let final_answer = best_answer.to_string();

    Ok(AggregationResult {
        prompt_id: prompt_id.to_string(),
        strategy: strategy_name.to_string(),
        final_answer,
        supporting_candidates: supporting,
        vote_counts: tally.counts,
        window_tallies,
        rationale,
    })
}

/// Candidates voting for `answer`, by descending confidence then ascending
/// sample index. The sort is stable, so full ties keep pool order.
fn supporting_candidates<'a>(
    pool: impl Iterator<Item = &'a Candidate>,
    answer: &str,
) -> Vec<Candidate> {
    let mut supporting: Vec<Candidate> = pool
        .filter(|c| extract_final_answer(c) == answer)
        .cloned()
        .collect();

    supporting.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.sample_index.cmp(&b.sample_index))
    });

    supporting
}

fn build_rationale(
    strategy_name: &str,
    best_answer: &str,
    ranked: &[(&str, usize)],
    supporting: &[Candidate],
    windows: Option<(usize, usize)>,
) -> String {
    let distribution = ranked
        .iter()
        .map(|(answer, count)| format!("{}: {}", answer, count))
        .collect::<Vec<_>>()
        .join(", ");
    let supporters = supporting
        .iter()
        .map(Candidate::short_label)
        .collect::<Vec<_>>()
        .join(", ");

    let mut rationale = format!(
        "{} selected '{}' with vote distribution [{}]. Supporting samples: {}.",
        strategy_name, best_answer, distribution, supporters
    );

    if let Some((count, size)) = windows {
        rationale.push_str(&format!(
            " Processed in {} windows of size {}.",
            count, size
        ));
    }

    rationale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(model: &str, index: usize, answer: &str, confidence: f64) -> Candidate {
        Candidate {
            prompt_id: "p".to_string(),
            model_name: model.to_string(),
            sample_index: index,
            text: format!("Answer {}", answer),
            final_answer: answer.to_string(),
            confidence,
            is_correct: None,
            metadata: BTreeMap::new(),
        }
    }

    fn mixed_pool() -> Vec<Candidate> {
        vec![
            make_candidate("A", 3, "7", 0.5),
            make_candidate("B", 0, "9", 0.7),
            make_candidate("C", 5, "7", 0.9),
            make_candidate("D", 1, "11", 0.2),
            make_candidate("E", 2, "9", 0.4),
            make_candidate("F", 4, "7", 0.5),
            make_candidate("G", 6, "11", 0.8),
        ]
    }

    #[test]
    fn test_flat_majority_prefers_highest_vote() {
        let candidates = vec![
            make_candidate("A", 0, "42", 0.9),
            make_candidate("B", 1, "42", 0.6),
            make_candidate("C", 2, "13", 0.95),
        ];

        let result = aggregate_flat(&candidates, "test").unwrap();

        assert_eq!(result.final_answer, "42");
        assert_eq!(result.supporting_labels(), vec!["A#0", "B#1"]);
        assert_eq!(result.prompt_id, "p");
        assert_eq!(result.strategy, "test");
    }

    #[test]
    fn test_windowed_counts_votes_across_windows() {
        let candidates = vec![
            make_candidate("A", 0, "7", 0.5),
            make_candidate("B", 1, "7", 0.5),
            make_candidate("C", 2, "9", 0.6),
            make_candidate("D", 3, "7", 0.4),
        ];

        let result = aggregate_windowed(&candidates, 2, "seq").unwrap();

        assert_eq!(result.final_answer, "7");
        assert_eq!(result.vote_counts["7"], 3);
        assert_eq!(result.supporting_labels(), vec!["A#0", "B#1", "D#3"]);
        assert_eq!(result.window_tallies.len(), 2);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(
            aggregate_flat(&[], "flat"),
            Err(AggregationError::EmptyInput {
                strategy: "flat".to_string()
            })
        );
        assert_eq!(
            aggregate_windowed(&[], 2, "seq"),
            Err(AggregationError::EmptyInput {
                strategy: "seq".to_string()
            })
        );
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let candidates = vec![make_candidate("A", 0, "7", 0.5)];
        assert_eq!(
            aggregate_windowed(&candidates, 0, "seq"),
            Err(AggregationError::InvalidWindowSize(0))
        );
    }

    #[test]
    fn test_tie_goes_to_earliest_sample() {
        let candidates = vec![
            make_candidate("A", 2, "x", 0.9),
            make_candidate("A", 0, "y", 0.1),
            make_candidate("A", 3, "x", 0.9),
            make_candidate("A", 1, "y", 0.1),
        ];

        let result = aggregate_flat(&candidates, "flat").unwrap();
        assert_eq!(result.final_answer, "y");
    }

    #[test]
    fn test_tie_with_same_earliest_sample_is_lexicographic() {
        // Mixed ensembles draw sample 0 from every proposer.
        let candidates = vec![
            make_candidate("Orion", 0, "55", 0.9),
            make_candidate("Nova", 0, "50", 0.4),
        ];

        let result = aggregate_flat(&candidates, "flat").unwrap();
        assert_eq!(result.final_answer, "50");

        let reversed: Vec<Candidate> = candidates.into_iter().rev().collect();
        assert_eq!(aggregate_flat(&reversed, "flat").unwrap().final_answer, "50");
    }

    #[test]
    fn test_windowed_sort_is_stable_for_duplicate_indices() {
        let candidates = vec![
            make_candidate("A", 1, "x", 0.5),
            make_candidate("B", 0, "y", 0.5),
            make_candidate("C", 0, "x", 0.5),
            make_candidate("D", 1, "y", 0.5),
        ];

        let result = aggregate_windowed(&candidates, 2, "seq").unwrap();

        let first_window = &result.window_tallies[0];
        assert_eq!((first_window.first_sample, first_window.last_sample), (0, 0));
        assert_eq!(first_window.votes.get("y"), Some(&1));
        assert_eq!(first_window.votes.get("x"), Some(&1));
        assert_eq!(first_window.ranked_votes(), vec![("x", 1), ("y", 1)]);
        assert_eq!(result.final_answer, "x");
        assert_eq!(result.supporting_labels(), vec!["C#0", "A#1"]);
        assert_eq!(
            result.final_answer,
            aggregate_flat(&candidates, "flat").unwrap().final_answer
        );

        // Supporters with identical keys keep their input order.
        let same_keys = vec![
            make_candidate("P", 0, "z", 0.5),
            make_candidate("Q", 0, "z", 0.5),
            make_candidate("R", 0, "z", 0.5),
        ];
        let result = aggregate_windowed(&same_keys, 2, "seq").unwrap();
        assert_eq!(result.supporting_labels(), vec!["P#0", "Q#0", "R#0"]);

        let reversed: Vec<Candidate> = same_keys.into_iter().rev().collect();
        let result = aggregate_windowed(&reversed, 2, "seq").unwrap();
        assert_eq!(result.supporting_labels(), vec!["R#0", "Q#0", "P#0"]);
    }

    #[test]
    fn test_answers_are_trimmed_but_not_case_folded() {
        let candidates = vec![
            make_candidate("A", 0, " Yes ", 0.5),
            make_candidate("B", 1, "yes", 0.5),
            make_candidate("C", 2, "Yes\n", 0.5),
        ];

        let result = aggregate_flat(&candidates, "flat").unwrap();

        assert_eq!(result.final_answer, "Yes");
        assert_eq!(result.vote_counts.get("Yes"), Some(&2));
        assert_eq!(result.vote_counts.get("yes"), Some(&1));
        assert_eq!(result.supporting_labels(), vec!["A#0", "C#2"]);
    }

    #[test]
    fn test_supporting_order_confidence_then_lower_index() {
        let candidates = vec![
            make_candidate("A", 4, "7", 0.5),
            make_candidate("B", 1, "7", 0.5),
            make_candidate("C", 3, "7", 0.8),
            make_candidate("D", 0, "9", 0.99),
        ];

        let result = aggregate_flat(&candidates, "flat").unwrap();
        assert_eq!(result.supporting_labels(), vec!["C#3", "B#1", "A#4"]);
    }

    #[test]
    fn test_winner_has_maximum_count_and_votes_sum_to_input() {
        let pool = mixed_pool();

        for result in [
            aggregate_flat(&pool, "flat").unwrap(),
            aggregate_windowed(&pool, 3, "seq").unwrap(),
        ] {
            let max = result.vote_counts.values().copied().max().unwrap();
            assert_eq!(result.winning_votes(), max);
            assert_eq!(result.support_size(), pool.len());
            assert_eq!(result.supporting_candidates.len(), max);
        }
    }

    #[test]
    fn test_windowed_votes_match_flat_for_any_window() {
        let pool = mixed_pool();
        let flat = aggregate_flat(&pool, "flat").unwrap();

        for window_size in 1..=pool.len() + 2 {
            let windowed = aggregate_windowed(&pool, window_size, "seq").unwrap();
            assert_eq!(windowed.vote_counts, flat.vote_counts);
            assert_eq!(windowed.final_answer, flat.final_answer);

            let expected_windows = (pool.len() + window_size - 1) / window_size;
            assert_eq!(windowed.window_tallies.len(), expected_windows);

            let window_total: usize = windowed.window_tallies.iter().map(|w| w.size()).sum();
            assert_eq!(window_total, pool.len());
        }
    }

    #[test]
    fn test_windows_follow_sample_order() {
        let result = aggregate_windowed(&mixed_pool(), 3, "seq").unwrap();

        let spans: Vec<(usize, usize)> = result
            .window_tallies
            .iter()
            .map(|w| (w.first_sample, w.last_sample))
            .collect();
        assert_eq!(spans, vec![(0, 2), (3, 5), (6, 6)]);

        // Samples 0..=2 are "9", "11", "9".
        assert_eq!(result.window_tallies[0].votes.get("9"), Some(&2));
        assert_eq!(result.window_tallies[2].votes.get("11"), Some(&1));
    }

    #[test]
    fn test_single_window_matches_flat() {
        let pool = mixed_pool();
        let flat = aggregate_flat(&pool, "flat").unwrap();

        for window_size in [pool.len(), pool.len() + 10] {
            let windowed = aggregate_windowed(&pool, window_size, "flat").unwrap();
            assert_eq!(windowed.window_tallies.len(), 1);
            assert_eq!(windowed.final_answer, flat.final_answer);
            assert_eq!(windowed.vote_counts, flat.vote_counts);
            assert_eq!(windowed.supporting_candidates, flat.supporting_candidates);
        }
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let pool = mixed_pool();
        assert_eq!(
            aggregate_flat(&pool, "flat").unwrap(),
            aggregate_flat(&pool, "flat").unwrap()
        );
        assert_eq!(
            aggregate_windowed(&pool, 2, "seq").unwrap(),
            aggregate_windowed(&pool, 2, "seq").unwrap()
        );
    }

    #[test]
    fn test_flat_rationale() {
        let candidates = vec![
            make_candidate("A", 0, "42", 0.9),
            make_candidate("B", 1, "42", 0.6),
            make_candidate("C", 2, "13", 0.95),
        ];

        let result = aggregate_flat(&candidates, "Self-MoA (majority)").unwrap();
        assert_eq!(
            result.rationale,
            "Self-MoA (majority) selected '42' with vote distribution [42: 2, 13: 1]. \
             Supporting samples: A#0, B#1."
        );
    }

    #[test]
    fn test_windowed_rationale_reports_windows() {
        let result = aggregate_windowed(&mixed_pool(), 3, "Self-MoA-Seq (window=3)").unwrap();

        assert!(result.rationale.starts_with("Self-MoA-Seq (window=3) selected '7'"));
        assert!(result.rationale.contains("[7: 3, 9: 2, 11: 2]"));
        assert!(result.rationale.contains("Supporting samples: C#5, A#3, F#4."));
        assert!(result.rationale.ends_with("Processed in 3 windows of size 3."));
    }
}
