//! Candidate producers.
//!
//! The aggregation engine never talks to a proposer directly: the showcase
//! collects candidates up front and hands the finished pools over.

pub mod mock;

pub use mock::MockModel;

use crate::models::{Candidate, Prompt};
use thiserror::Error;

/// Errors raised while producing candidates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProposerError {
    #[error("strength for proposer '{name}' must be between 0 and 1, got {strength}")]
    InvalidStrength { name: String, strength: f64 },

    #[error("prompt {prompt_id} has no distractors and non-numeric answer '{answer}'")]
    NoFallbackAnswer { prompt_id: String, answer: String },
}

/// Anything that can sample an answer for a prompt.
pub trait Proposer {
    /// Display name, used in candidate labels.
    fn name(&self) -> &str;

    /// Produce the `sample_index`-th sample for `prompt`.
    fn generate(
        &self,
        prompt: &Prompt,
        sample_index: usize,
        temperature: f32,
    ) -> Result<Candidate, ProposerError>;
}

/// Draw `samples` consecutive samples from one proposer.
pub fn collect_samples(
    proposer: &dyn Proposer,
    prompt: &Prompt,
    samples: usize,
    temperature: f32,
) -> Result<Vec<Candidate>, ProposerError> {
    (0..samples)
        .map(|index| proposer.generate(prompt, index, temperature))
        .collect()
}

/// Draw the first sample of every proposer.
pub fn collect_first_samples(
    proposers: &[&dyn Proposer],
    prompt: &Prompt,
    temperature: f32,
) -> Result<Vec<Candidate>, ProposerError> {
    proposers
        .iter()
        .map(|proposer| proposer.generate(prompt, 0, temperature))
        .collect()
}
