//! Deterministic mock proposer.
//!
//! Simulates a strong or weak model without any inference. Answers come
//! from scripted tables when present; otherwise a seeded draw decides
//! whether the sample is correct. The same inputs always yield the same
//! candidate.

use super::{Proposer, ProposerError};
use crate::models::{Candidate, Prompt};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Default seed mixed into every draw.
pub const DEFAULT_SEED: u64 = 13;

const MAX_CONFIDENCE: f64 = 0.99;

/// A mock model with a fixed probability of answering correctly.
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    strength: f64,
    scripted_outcomes: HashMap<String, Vec<bool>>,
    scripted_final_answers: HashMap<String, Vec<String>>,
    seed: u64,
}

impl MockModel {
    /// Create a mock model; `strength` is the chance of a correct sample.
    pub fn new(name: impl Into<String>, strength: f64) -> Result<Self, ProposerError> {
        let name = name.into();
        if !(0.0..=1.0).contains(&strength) {
            return Err(ProposerError::InvalidStrength { name, strength });
        }

        Ok(Self {
            name,
            strength,
            scripted_outcomes: HashMap::new(),
            scripted_final_answers: HashMap::new(),
            seed: DEFAULT_SEED,
        })
    }

    /// Force correct/incorrect outcomes per prompt, indexed by sample.
    pub fn with_scripted_outcomes(mut self, outcomes: HashMap<String, Vec<bool>>) -> Self {
        self.scripted_outcomes = outcomes;
        self
    }

    /// Force literal final answers per prompt, indexed by sample.
    pub fn with_scripted_final_answers(mut self, answers: HashMap<String, Vec<String>>) -> Self {
        self.scripted_final_answers = answers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Pick the final answer for a sample.
    fn choose_answer(
        &self,
        prompt: &Prompt,
        sample_index: usize,
        temperature: f32,
    ) -> Result<String, ProposerError> {
        if let Some(answer) = scripted(&self.scripted_final_answers, &prompt.id, sample_index) {
            return Ok(answer.clone());
        }

        let correct = match scripted(&self.scripted_outcomes, &prompt.id, sample_index) {
            Some(outcome) => *outcome,
            None => {
                let key = self.draw_key("hit", &prompt.id, sample_index, temperature);
                unit_draw(&key) < self.strength
            }
        };

        if correct {
            return Ok(prompt.answer.clone());
        }

        if !prompt.distractors.is_empty() {
            let key = self.draw_key("miss", &prompt.id, sample_index, temperature);
            let pick = (unit_draw(&key) * prompt.distractors.len() as f64) as usize;
            let pick = pick.min(prompt.distractors.len() - 1);
            return Ok(prompt.distractors[pick].clone());
        }

        prompt
            .answer
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|gold| gold.checked_add(1))
            .map(|wrong| wrong.to_string())
            .ok_or_else(|| ProposerError::NoFallbackAnswer {
                prompt_id: prompt.id.clone(),
                answer: prompt.answer.clone(),
            })
    }

    fn draw_key(
        &self,
        purpose: &str,
        prompt_id: &str,
        sample_index: usize,
        temperature: f32,
    ) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            purpose, self.seed, self.name, prompt_id, sample_index, temperature
        )
    }

    fn correct_reasoning(prompt: &Prompt, answer: &str) -> String {
        format!(
            "Considering the question: {}\n\
             Break it into steps, compute carefully, and verify the result.\n\
             Double-checking gives {}, which matches all constraints.",
            prompt.question, answer
        )
    }

    fn incorrect_reasoning(prompt: &Prompt, answer: &str) -> String {
        format!(
            "Quick intuition on: {}\n\
             A faster mental calculation suggests the answer is {}, \
             even if not every step is fully justified.",
            prompt.question, answer
        )
    }
}

impl Proposer for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(
        &self,
        prompt: &Prompt,
        sample_index: usize,
        temperature: f32,
    ) -> Result<Candidate, ProposerError> {
        let final_answer = self.choose_answer(prompt, sample_index, temperature)?;
        let is_correct = final_answer == prompt.answer;

        let (confidence, reasoning) = if is_correct {
            (
                0.85 + 0.1 * (self.strength - 0.5),
                Self::correct_reasoning(prompt, &final_answer),
            )
        } else {
            (
                0.35 + 0.2 * (self.strength - 0.5),
                Self::incorrect_reasoning(prompt, &final_answer),
            )
        };

        debug!(
            "{} sample {} for {}: '{}' (correct: {})",
            self.name, sample_index, prompt.id, final_answer, is_correct
        );

        let mut metadata = BTreeMap::new();
        metadata.insert("temperature".to_string(), format!("{:.2}", temperature));

        Ok(Candidate {
            prompt_id: prompt.id.clone(),
            model_name: self.name.clone(),
            sample_index,
            text: format!("{}\nFinal Answer: {}", reasoning, final_answer),
            final_answer,
            confidence: confidence.clamp(0.0, MAX_CONFIDENCE),
            is_correct: Some(is_correct),
            metadata,
        })
    }
}

/// Scripted entry for a sample; indices past the end reuse the last entry.
fn scripted<'a, T>(
    table: &'a HashMap<String, Vec<T>>,
    prompt_id: &str,
    index: usize,
) -> Option<&'a T> {
    let entries = table.get(prompt_id)?;
    entries.get(index).or_else(|| entries.last())
}

/// Uniform value in [0, 1) derived from the SHA-256 digest of `key`.
fn unit_draw(key: &str) -> f64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
}
