//! Markdown and JSON report generation.
//!
//! This module renders the showcase results: one section per prompt with
//! the baseline sample, every aggregation outcome and its rationale, then
//! an aggregate accuracy table.

use crate::config::ReportConfig;
use crate::eval::exact_match;
use crate::models::{
    AccuracyRow, AggregationResult, Candidate, PromptSection, ReportMetadata, ShowcaseReport,
    WindowTally,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ShowcaseReport, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Self-MoA Showcase Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));

    for section in &report.sections {
        output.push_str(&generate_prompt_section(section, options));
    }

    output.push_str("---\n\n");
    output.push_str(&generate_accuracy_section(&report.accuracy));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Prompts:** {} ({})\n",
        metadata.prompt_count, metadata.prompts_source
    ));
    section.push_str(&format!(
        "- **Primary Proposer:** `{}`\n",
        metadata.primary_proposer
    ));
    section.push_str(&format!(
        "- **Mixed Ensemble:** {}\n",
        metadata
            .proposers
            .iter()
            .map(|p| format!("`{}`", p))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    section.push_str(&format!("- **Self-MoA Samples:** {}\n", metadata.self_samples));
    section.push_str(&format!(
        "- **Sequential Window:** {}\n",
        metadata.sequential_window
    ));
    section.push_str(&format!("- **Temperature:** {:.2}\n", metadata.temperature));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &ShowcaseReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");

    for section in &report.sections {
        let id = &section.prompt.id;
        toc.push_str(&format!("- [Prompt {}](#{})\n", id, prompt_anchor(id)));
    }

    toc.push_str("- [Aggregate Accuracy](#aggregate-accuracy)\n\n");

    toc
}

fn prompt_anchor(prompt_id: &str) -> String {
    format!("prompt-{}", prompt_id.replace(['/', '.', ' '], "-").to_lowercase())
}

fn outcome_mark(answer: &str, reference: &str) -> &'static str {
    if exact_match(answer, reference) {
        "✅"
    } else {
        "❌"
    }
}

/// Generate the section for a single prompt.
fn generate_prompt_section(section: &PromptSection, options: &ReportConfig) -> String {
    let mut output = String::new();
    let reference = &section.prompt.answer;

    output.push_str(&format!("## Prompt {}\n\n", section.prompt.id));
    output.push_str(&format!("**Question:** {}\n\n", section.prompt.question));

    output.push_str("### Single Model Baseline\n\n");
    output.push_str(&format!(
        "{} **{} sample** → **{}**\n\n",
        outcome_mark(&section.baseline.final_answer, reference),
        section.baseline.model_name,
        section.baseline.final_answer
    ));
    if options.include_baseline_reasoning {
        output.push_str("```\n");
        output.push_str(&section.baseline.text);
        output.push_str("\n```\n\n");
    }

    output.push_str("### Mixed-MoA Aggregation\n\n");
    output.push_str(&generate_result_heading(&section.mixed, reference));
    if options.include_candidate_tables {
        output.push_str(&generate_candidate_table(&section.mixed_candidates));
    }

    output.push_str("### Self-MoA Aggregation\n\n");
    output.push_str(&generate_result_heading(&section.self_moa, reference));
    if options.include_candidate_tables {
        output.push_str(&generate_candidate_table(&section.self_candidates));
    }

    output.push_str("### Self-MoA-Seq Aggregation\n\n");
    output.push_str(&generate_result_heading(&section.sequential, reference));
    output.push_str(&generate_window_table(&section.sequential.window_tallies));

    output
}

/// Strategy headline followed by its rationale.
fn generate_result_heading(result: &AggregationResult, reference: &str) -> String {
    format!(
        "{} **{}** → **{}**\n\n{}\n\n",
        outcome_mark(&result.final_answer, reference),
        result.strategy,
        result.final_answer,
        result.rationale
    )
}

fn generate_candidate_table(candidates: &[Candidate]) -> String {
    let mut table = String::new();

    table.push_str("| Model Sample | Final Answer | Confidence |\n");
    table.push_str("| --- | --- | --- |\n");
    for candidate in candidates {
        table.push_str(&format!(
            "| {} | {} | {:.2} |\n",
            candidate.short_label(),
            candidate.final_answer,
            candidate.confidence
        ));
    }
    table.push('\n');

    table
}

fn generate_window_table(windows: &[WindowTally]) -> String {
    if windows.is_empty() {
        return String::new();
    }

    let mut table = String::new();

    table.push_str("| Window | Samples | Size | Votes |\n");
    table.push_str("| --- | --- | --- | --- |\n");
    for window in windows {
        let votes = window
            .ranked_votes()
            .iter()
            .map(|(answer, count)| format!("{}: {}", answer, count))
            .collect::<Vec<_>>()
            .join(", ");

        table.push_str(&format!(
            "| {} | {}-{} | {} | {} |\n",
            window.index + 1,
            window.first_sample,
            window.last_sample,
            window.size(),
            votes
        ));
    }
    table.push('\n');

    table
}

/// Generate the aggregate accuracy table.
fn generate_accuracy_section(rows: &[AccuracyRow]) -> String {
    let mut section = String::new();

    section.push_str("## Aggregate Accuracy\n\n");
    section.push_str("| Strategy | Accuracy | Correct / Total |\n");
    section.push_str("| --- | --- | --- |\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {:.2} | {} / {} |\n",
            row.strategy, row.accuracy, row.correct, row.total
        ));
    }
    section.push('\n');

    if let Some(verdict) = accuracy_verdict(rows) {
        section.push_str(&verdict);
        section.push_str("\n\n");
    }

    section
}

/// One-line comparison of the best Self-MoA variant against the mixed ensemble.
fn accuracy_verdict(rows: &[AccuracyRow]) -> Option<String> {
    let mixed = rows.iter().find(|r| r.strategy.starts_with("Mixed-MoA"))?;
    let best_self = rows
        .iter()
        .filter(|r| r.strategy.starts_with("Self-MoA"))
        .max_by(|a, b| a.accuracy.total_cmp(&b.accuracy))?;

    let verdict = if best_self.accuracy > mixed.accuracy {
        "Self-MoA variants outperform the mixed ensemble despite using a single proposer model."
    } else if best_self.accuracy < mixed.accuracy {
        "The mixed ensemble outperforms every Self-MoA variant on these prompts."
    } else {
        "Self-MoA and the mixed ensemble perform equally on these prompts."
    };
    Some(verdict.to_string())
}

/// Generate the report footer.
fn generate_footer() -> String {
    "*Report generated by selfmoa*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ShowcaseReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content, creating parent directories as needed.
pub fn save_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
