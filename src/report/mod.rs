//! Report rendering.
//!
//! Markdown is the default artifact; JSON carries the same structure.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, save_report};
