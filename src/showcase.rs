//! Showcase pipeline.
//!
//! For every prompt this collects a single-sample baseline, a mixed pool
//! (first sample of each proposer) and a Self-MoA pool (repeated samples
//! of the primary proposer), aggregates the pools and scores the results
//! against the reference answers.

use crate::aggregation::{aggregate_flat, aggregate_windowed};
use crate::config::Config;
use crate::eval::evaluate;
use crate::models::{AccuracyRow, Prompt, PromptSection, ReportMetadata, ShowcaseReport};
use crate::proposer::{collect_first_samples, collect_samples, MockModel, Proposer};
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

pub const MIXED_STRATEGY: &str = "Mixed-MoA (majority)";
pub const SELF_STRATEGY: &str = "Self-MoA (majority)";

/// Label of the windowed strategy for a given window size.
pub fn sequential_strategy(window: usize) -> String {
    format!("Self-MoA-Seq (window={})", window)
}

/// Sampling parameters for one run.
#[derive(Debug, Clone)]
pub struct ShowcaseSettings {
    pub self_samples: usize,
    pub sequential_window: usize,
    pub temperature: f32,
    pub show_progress: bool,
}

/// A configured showcase run.
pub struct Showcase {
    proposers: Vec<MockModel>,
    primary: usize,
    settings: ShowcaseSettings,
}

impl Showcase {
    /// Build the proposer roster from a validated config.
    pub fn from_config(config: &Config, show_progress: bool) -> Result<Self> {
        let proposers = config
            .proposers
            .iter()
            .map(|p| {
                p.build()
                    .with_context(|| format!("Invalid proposer '{}'", p.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let primary = proposers
            .iter()
            .position(|p| p.name() == config.sampling.primary)
            .with_context(|| format!("Unknown primary proposer '{}'", config.sampling.primary))?;

        let settings = ShowcaseSettings {
            self_samples: config.sampling.self_samples,
            sequential_window: config.sampling.sequential_window,
            temperature: config.sampling.temperature,
            show_progress,
        };

        Ok(Self::new(proposers, primary, settings))
    }

    fn new(proposers: Vec<MockModel>, primary: usize, settings: ShowcaseSettings) -> Self {
        Self {
            proposers,
            primary,
            settings,
        }
    }

    fn primary(&self) -> &MockModel {
        &self.proposers[self.primary]
    }

    /// Run every prompt and assemble the report.
    pub fn run(&self, prompts: &[Prompt], prompts_source: &str) -> Result<ShowcaseReport> {
        info!(
            "Running {} prompts with primary proposer {} (strength {:.2})",
            prompts.len(),
            self.primary().name(),
            self.primary().strength()
        );

        let progress = self.progress_bar(prompts.len())?;
        let mut sections = Vec::with_capacity(prompts.len());

        for prompt in prompts {
            progress.set_message(prompt.id.clone());
            let section = self
                .run_prompt(prompt)
                .with_context(|| format!("Failed to process prompt {}", prompt.id))?;
            sections.push(section);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let accuracy = self.accuracy_rows(&sections);
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            prompts_source: prompts_source.to_string(),
            prompt_count: prompts.len(),
            primary_proposer: self.primary().name().to_string(),
            proposers: self.proposers.iter().map(|p| p.name().to_string()).collect(),
            self_samples: self.settings.self_samples,
            sequential_window: self.settings.sequential_window,
            temperature: self.settings.temperature,
        };

        Ok(ShowcaseReport {
            metadata,
            sections,
            accuracy,
        })
    }

    fn run_prompt(&self, prompt: &Prompt) -> Result<PromptSection> {
        let temperature = self.settings.temperature;
        let primary: &dyn Proposer = self.primary();

        let baseline = primary.generate(prompt, 0, temperature)?;

        let roster: Vec<&dyn Proposer> = self
            .proposers
            .iter()
            .map(|p| p as &dyn Proposer)
            .collect();
        let mixed_candidates = collect_first_samples(&roster, prompt, temperature)?;
        let self_candidates =
            collect_samples(primary, prompt, self.settings.self_samples, temperature)?;

        let mixed = aggregate_flat(&mixed_candidates, MIXED_STRATEGY)?;
        let self_moa = aggregate_flat(&self_candidates, SELF_STRATEGY)?;
        let window = self.settings.sequential_window;
        let sequential =
            aggregate_windowed(&self_candidates, window, &sequential_strategy(window))?;

        debug!(
            "{}: baseline '{}', mixed '{}', self '{}', seq '{}' (gold '{}')",
            prompt.id,
            baseline.final_answer,
            mixed.final_answer,
            self_moa.final_answer,
            sequential.final_answer,
            prompt.answer
        );
        debug!(
            "{}: Self-MoA won {}/{} votes, supported by {:?}",
            prompt.id,
            self_moa.winning_votes(),
            self_moa.support_size(),
            self_moa.supporting_labels()
        );

        Ok(PromptSection {
            prompt: prompt.clone(),
            baseline,
            mixed_candidates,
            mixed,
            self_candidates,
            self_moa,
            sequential,
        })
    }

    fn accuracy_rows(&self, sections: &[PromptSection]) -> Vec<AccuracyRow> {
        let rows = [
            (
                format!("Single Sample ({})", self.primary().name()),
                sections
                    .iter()
                    .map(|s| (s.baseline.final_answer.as_str(), s.prompt.answer.as_str()))
                    .collect::<Vec<_>>(),
            ),
            (
                MIXED_STRATEGY.to_string(),
                sections
                    .iter()
                    .map(|s| (s.mixed.final_answer.as_str(), s.prompt.answer.as_str()))
                    .collect(),
            ),
            (
                SELF_STRATEGY.to_string(),
                sections
                    .iter()
                    .map(|s| (s.self_moa.final_answer.as_str(), s.prompt.answer.as_str()))
                    .collect(),
            ),
            (
                "Self-MoA-Seq".to_string(),
                sections
                    .iter()
                    .map(|s| (s.sequential.final_answer.as_str(), s.prompt.answer.as_str()))
                    .collect(),
            ),
        ];

        rows.into_iter()
            .map(|(strategy, pairs)| {
                let result = evaluate(pairs);
                AccuracyRow {
                    strategy,
                    correct: result.correct,
                    total: result.total,
                    accuracy: result.accuracy(),
                }
            })
            .collect()
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar> {
        if !self.settings.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Ok(pb)
    }
}
