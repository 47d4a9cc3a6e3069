//! Data models for the Self-MoA showcase.
//!
//! This module contains the core data structures shared by the proposers,
//! the aggregation engine, the evaluator and the report generator.

use crate::aggregation::rank_votes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A benchmark question with its reference answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Stable identifier (e.g. `gsm8k-1`).
    pub id: String,
    /// Question text shown to the proposers.
    pub question: String,
    /// Gold answer.
    pub answer: String,
    /// Plausible wrong answers a weak proposer may fall back to.
    #[serde(default)]
    pub distractors: Vec<String>,
}

/// A single proposer sample for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Prompt this sample answers.
    pub prompt_id: String,
    /// Name of the proposer that produced the sample.
    pub model_name: String,
    /// Position of the sample in its proposer's generation order.
    pub sample_index: usize,
    /// Full generated text, ending with the final answer line.
    pub text: String,
    /// Extracted final answer.
    pub final_answer: String,
    /// Self-reported confidence in [0, 1].
    pub confidence: f64,
    /// Whether the sample matches the gold answer, when the producer knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Free-form producer metadata (e.g. sampling temperature).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Candidate {
    /// Label used in rationales and tables, e.g. `Orion-Strong#2`.
    pub fn short_label(&self) -> String {
        format!("{}#{}", self.model_name, self.sample_index)
    }
}

/// Votes cast inside one window of a windowed aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTally {
    /// Zero-based window position.
    pub index: usize,
    /// Smallest sample index covered by the window.
    pub first_sample: usize,
    /// Largest sample index covered by the window.
    pub last_sample: usize,
    /// Local vote counts.
    pub votes: BTreeMap<String, usize>,
    /// Earliest sample index voting for each answer in this window.
    #[serde(default)]
    pub earliest: BTreeMap<String, usize>,
}

impl WindowTally {
    /// Number of candidates in the window.
    pub fn size(&self) -> usize {
        self.votes.values().sum()
    }

    /// Local votes ranked with the same tie-break as the final decision.
    pub fn ranked_votes(&self) -> Vec<(&str, usize)> {
        rank_votes(&self.votes, &self.earliest)
    }
}

/// Outcome of one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub prompt_id: String,
    /// Label naming the policy and its parameters.
    pub strategy: String,
    pub final_answer: String,
    /// Candidates that voted for `final_answer`, highest confidence first.
    pub supporting_candidates: Vec<Candidate>,
    /// Vote total per normalized answer. Ordered for stable output only;
    /// see [`crate::aggregation::aggregator`] for how the winner is ranked.
    pub vote_counts: BTreeMap<String, usize>,
    /// Per-window tallies; empty for flat aggregation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub window_tallies: Vec<WindowTally>,
    pub rationale: String,
}

impl AggregationResult {
    /// Total number of votes cast.
    pub fn support_size(&self) -> usize {
        self.vote_counts.values().sum()
    }

    /// Labels of the supporting candidates in result order.
    pub fn supporting_labels(&self) -> Vec<String> {
        self.supporting_candidates
            .iter()
            .map(Candidate::short_label)
            .collect()
    }

    /// Votes received by the winning answer.
    pub fn winning_votes(&self) -> usize {
        self.vote_counts
            .get(&self.final_answer)
            .copied()
            .unwrap_or_default()
    }
}

/// Metadata about a showcase run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Source file of the prompts.
    pub prompts_source: String,
    /// Number of prompts processed.
    pub prompt_count: usize,
    /// Proposer used for the baseline and Self-MoA pools.
    pub primary_proposer: String,
    /// All proposers that took part in the mixed ensemble.
    pub proposers: Vec<String>,
    /// Samples drawn per prompt for Self-MoA.
    pub self_samples: usize,
    /// Window size of the sequential aggregator.
    pub sequential_window: usize,
    /// Sampling temperature passed to the proposers.
    pub temperature: f32,
}

/// Everything produced for a single prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSection {
    pub prompt: Prompt,
    /// Single sample from the primary proposer.
    pub baseline: Candidate,
    /// One sample from each proposer.
    pub mixed_candidates: Vec<Candidate>,
    pub mixed: AggregationResult,
    /// Repeated samples from the primary proposer.
    pub self_candidates: Vec<Candidate>,
    pub self_moa: AggregationResult,
    pub sequential: AggregationResult,
}

/// Accuracy of one strategy over all prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRow {
    pub strategy: String,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

/// The complete showcase report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseReport {
    pub metadata: ReportMetadata,
    pub sections: Vec<PromptSection>,
    pub accuracy: Vec<AccuracyRow>,
}
