//! Self-MoA - majority-vote aggregation showcase
//!
//! A CLI tool that samples answers from mock proposers, aggregates them
//! with flat and windowed majority voting, and renders a Markdown or JSON
//! report comparing a single sample, a mixed ensemble and Self-MoA.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments or config, unreadable prompts, etc.)

mod aggregation;
mod cli;
mod config;
mod eval;
mod models;
mod prompts;
mod proposer;
mod report;
mod showcase;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use showcase::Showcase;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Where the effective configuration came from.
enum ConfigSource {
    File(PathBuf),
    BuiltIn,
    Unreadable(anyhow::Error),
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is resolved first so `general.verbose` can raise the log level
    let (config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(args.log_level(config.general.verbose))?;

    info!("selfmoa v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match source {
        ConfigSource::File(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
        ConfigSource::Unreadable(e) => warn!("Failed to load config: {:#}", e),
    }

    if let Err(e) = run_showcase(&args, config) {
        error!("Showcase failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .selfmoa.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize proposers, sampling and report options.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // An explicit config path must load
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(e))),
    }
}

/// Run the complete showcase workflow.
fn run_showcase(args: &Args, mut config: Config) -> Result<()> {
    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;

    let prompts_path = config.sampling.prompts.clone();
    let prompts = prompts::load_prompts(&prompts_path)?;
    if prompts.is_empty() {
        warn!("No prompts found in {}", prompts_path.display());
    }

    if !args.quiet {
        println!("🧪 Running Self-MoA showcase on {} prompts", prompts.len());
        println!("   Primary proposer: {}", config.sampling.primary);
        println!(
            "   Self samples: {} | Window: {} | Temperature: {:.2}\n",
            config.sampling.self_samples,
            config.sampling.sequential_window,
            config.sampling.temperature
        );
    }

    let showcase = Showcase::from_config(&config, !args.quiet)?;
    let report = showcase.run(&prompts, &prompts_path.display().to_string())?;

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    println!("{}", output);

    if config.general.save {
        report::save_report(&output, &config.general.output)?;
        info!("Report written to {}", config.general.output.display());
        if !args.quiet {
            println!("\n✅ Saved showcase to {}", config.general.output.display());
        }
    }

    Ok(())
}
