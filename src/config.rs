//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.selfmoa.toml` files.

use crate::cli::OutputFormat;
use crate::proposer::mock::DEFAULT_SEED;
use crate::proposer::MockModel;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".selfmoa.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Sampling settings.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Mock proposer roster.
    #[serde(default = "default_proposers")]
    pub proposers: Vec<ProposerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            sampling: SamplingConfig::default(),
            report: ReportConfig::default(),
            proposers: default_proposers(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Where the report is written.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Write the report to `output` (it is always printed).
    #[serde(default = "default_true")]
    pub save: bool,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            save: true,
            verbose: false,
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("output/self_moa_showcase.md")
}

fn default_true() -> bool {
    true
}

/// Sampling and aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// JSONL prompt file.
    #[serde(default = "default_prompts")]
    pub prompts: PathBuf,

    /// Samples drawn from the primary proposer per prompt.
    #[serde(default = "default_self_samples")]
    pub self_samples: usize,

    /// Window size for the sequential aggregator.
    #[serde(default = "default_sequential_window")]
    pub sequential_window: usize,

    /// Sampling temperature (informational for mock proposers, but it
    /// feeds their seeded draws).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Proposer used for the baseline and the Self-MoA pools.
    #[serde(default = "default_primary")]
    pub primary: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            prompts: default_prompts(),
            self_samples: default_self_samples(),
            sequential_window: default_sequential_window(),
            temperature: default_temperature(),
            primary: default_primary(),
        }
    }
}

fn default_prompts() -> PathBuf {
    PathBuf::from("data/prompts.jsonl")
}

fn default_self_samples() -> usize {
    4
}

fn default_sequential_window() -> usize {
    2
}

fn default_temperature() -> f32 {
    0.7
}

fn default_primary() -> String {
    "Orion-Strong".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Include per-candidate tables for the mixed and Self-MoA pools.
    #[serde(default = "default_true")]
    pub include_candidate_tables: bool,

    /// Include the baseline sample's reasoning text.
    #[serde(default = "default_true")]
    pub include_baseline_reasoning: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_candidate_tables: true,
            include_baseline_reasoning: true,
        }
    }
}

/// One mock proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposerConfig {
    /// Display name.
    pub name: String,

    /// Probability of a correct sample, in [0, 1].
    pub strength: f64,

    /// Seed mixed into the proposer's draws.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Literal answers per prompt id, indexed by sample.
    #[serde(default)]
    pub scripted_final_answers: HashMap<String, Vec<String>>,

    /// Forced correct/incorrect outcomes per prompt id, indexed by sample.
    #[serde(default)]
    pub scripted_outcomes: HashMap<String, Vec<bool>>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl ProposerConfig {
    fn scripted(name: &str, strength: f64, answers: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            name: name.to_string(),
            strength,
            seed: DEFAULT_SEED,
            scripted_final_answers: answers
                .into_iter()
                .map(|(prompt_id, list)| {
                    (
                        prompt_id.to_string(),
                        list.into_iter().map(String::from).collect(),
                    )
                })
                .collect(),
            scripted_outcomes: HashMap::new(),
        }
    }

    /// Build the mock model described by this entry.
    pub fn build(&self) -> Result<MockModel> {
        let model = MockModel::new(self.name.clone(), self.strength)?
            .with_seed(self.seed)
            .with_scripted_final_answers(self.scripted_final_answers.clone())
            .with_scripted_outcomes(self.scripted_outcomes.clone());
        Ok(model)
    }
}

/// The showcase roster: one strong, one medium and one weak proposer.
fn default_proposers() -> Vec<ProposerConfig> {
    vec![
        ProposerConfig::scripted(
            "Orion-Strong",
            0.9,
            vec![
                ("gsm8k-1", vec!["55", "60", "60", "60", "60"]),
                ("gsm8k-2", vec!["12", "12", "12", "12", "12"]),
                ("gsm8k-3", vec!["30", "35", "35", "35", "35"]),
            ],
        ),
        ProposerConfig::scripted(
            "Nova-Medium",
            0.55,
            vec![
                ("gsm8k-1", vec!["50"]),
                ("gsm8k-2", vec!["9"]),
                ("gsm8k-3", vec!["28"]),
            ],
        ),
        ProposerConfig::scripted(
            "Atlas-Weak",
            0.3,
            vec![
                ("gsm8k-1", vec!["50"]),
                ("gsm8k-2", vec!["16"]),
                ("gsm8k-3", vec!["30"]),
            ],
        ),
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments only override settings they explicitly provide.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref prompts) = args.prompts {
            self.sampling.prompts = prompts.clone();
        }
        if let Some(samples) = args.self_samples {
            self.sampling.self_samples = samples;
        }
        if let Some(window) = args.sequential_window {
            self.sampling.sequential_window = window;
        }
        if let Some(temperature) = args.temperature {
            self.sampling.temperature = temperature;
        }
        if let Some(ref primary) = args.primary {
            self.sampling.primary = primary.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if args.no_save {
            self.general.save = false;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.proposers.is_empty() {
            bail!("At least one proposer must be configured");
        }
        if self.sampling.self_samples == 0 {
            bail!("self_samples must be at least 1");
        }
        if self.sampling.sequential_window == 0 {
            bail!("sequential_window must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.sampling.temperature) {
            bail!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.sampling.temperature
            );
        }
        if self.primary_proposer().is_none() {
            bail!(
                "Primary proposer '{}' is not in the proposer list",
                self.sampling.primary
            );
        }
        Ok(())
    }

    /// The proposer entry named by `sampling.primary`.
    pub fn primary_proposer(&self) -> Option<&ProposerConfig> {
        self.proposers
            .iter()
            .find(|p| p.name == self.sampling.primary)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::Proposer;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sampling.self_samples, 4);
        assert_eq!(config.sampling.sequential_window, 2);
        assert_eq!(config.proposers.len(), 3);
        assert_eq!(
            config.primary_proposer().map(|p| p.name.as_str()),
            Some("Orion-Strong")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[sampling]
self_samples = 6
primary = "Solo"

[report]
format = "json"

[[proposers]]
name = "Solo"
strength = 0.7

[proposers.scripted_final_answers]
"q-1" = ["3", "4"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, PathBuf::from("custom_report.md"));
        assert!(config.general.verbose);
        assert!(config.general.save);
        assert_eq!(config.sampling.self_samples, 6);
        assert_eq!(config.sampling.sequential_window, 2);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.proposers.len(), 1);
        assert_eq!(config.proposers[0].seed, DEFAULT_SEED);
        assert_eq!(
            config.proposers[0].scripted_final_answers.get("q-1"),
            Some(&vec!["3".to_string(), "4".to_string()])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_primary() {
        let mut config = Config::default();
        config.sampling.primary = "Ghost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = Config::default();
        config.sampling.sequential_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.sampling.temperature = -3.0;
        assert!(config.validate().is_err());

        config.sampling.temperature = f32::NAN;
        assert!(config.validate().is_err());

        let parsed: Config = toml::from_str("[sampling]\ntemperature = 2.5\n").unwrap();
        assert!(parsed.validate().is_err());

        config.sampling.temperature = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_toml_round_trip() {
        let toml_str = Config::default_toml().unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[sampling]"));
        assert!(toml_str.contains("[[proposers]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.proposers, Config::default().proposers);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[sampling]\nsequential_window = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sampling.sequential_window, 3);
        assert_eq!(config.proposers.len(), 3);
    }

    #[test]
    fn test_build_proposer() {
        let config = Config::default();
        let model = config.proposers[0].build().unwrap();
        assert_eq!(model.name(), "Orion-Strong");
        assert_eq!(model.strength(), 0.9);

        let bad = ProposerConfig {
            strength: 2.0,
            ..config.proposers[0].clone()
        };
        assert!(bad.build().is_err());
    }
}
