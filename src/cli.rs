//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Values left unset fall back to the
//! configuration file, then to built-in defaults.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Self-MoA - majority-vote aggregation showcase
///
/// Samples answers from mock proposers, aggregates them with flat and
/// windowed majority voting, and reports per-prompt rationales plus
/// aggregate accuracy against reference answers.
///
/// Examples:
///   selfmoa
///   selfmoa --prompts data/prompts.jsonl --self-samples 5 --sequential-window 3
///   selfmoa --format json --output report.json
///   selfmoa --no-save --quiet
///   selfmoa --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSONL file with one prompt per line
    ///
    /// Each line holds `id`, `question`, `answer` and optional `distractors`.
    /// Default: from config or data/prompts.jsonl.
    #[arg(short, long, value_name = "FILE", env = "SELFMOA_PROMPTS")]
    pub prompts: Option<PathBuf>,

    /// Number of samples drawn from the primary proposer for Self-MoA
    #[arg(long, value_name = "COUNT")]
    pub self_samples: Option<usize>,

    /// Window size for the sequential Self-MoA aggregator
    #[arg(long, value_name = "SIZE")]
    pub sequential_window: Option<usize>,

    /// Sampling temperature passed to the proposers (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Proposer used for the baseline and Self-MoA pools
    #[arg(long, value_name = "NAME")]
    pub primary: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the report without writing it to disk
    #[arg(long)]
    pub no_save: bool,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .selfmoa.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .selfmoa.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.self_samples == Some(0) {
            return Err("Self samples must be at least 1".to_string());
        }

        if self.sequential_window == Some(0) {
            return Err("Sequential window must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref prompts) = self.prompts {
            if !prompts.is_file() {
                return Err(format!("Prompts file does not exist: {}", prompts.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over a verbose config file.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
