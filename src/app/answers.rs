//! Interactive answers and their conversion into a pipeline configuration.
//!
//! The prompts in `cli::prompt` only collect raw answers; everything that
//! validates or interprets them lives here and does no I/O.

use crate::domain::{CutSet, PipelineConfig};
use crate::error::AppError;

/// What the user asked for, as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlotAnswers {
    /// Catalog labels in selection order.
    pub samples: Vec<String>,
    /// Branches in selection order.
    pub branches: Vec<String>,
    /// Present in 2-D mode.
    pub y_branch: Option<String>,
    /// Cut expressions separated by whitespace or commas, e.g. `tau_pt:20: tau_eta::2.5`.
    pub cuts: String,
    /// Output base name; empty keeps the template's.
    pub output: String,
}

/// Split free text into cut expressions.
pub fn split_cut_text(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Validate an output base name: no directories, `.png` suffix dropped.
pub fn clean_output_base(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    let name = name
        .strip_suffix(".png")
        .or_else(|| name.strip_suffix(".PNG"))
        .unwrap_or(name);
    if name.is_empty() {
        return Err(AppError::config("Output name must not be empty."));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(AppError::config(format!(
            "Output name '{name}' must be a plain file name (use --out-dir for the directory)."
        )));
    }
    Ok(name.to_string())
}

/// Overlay the answers onto `template` (built from flags).
pub fn config_from_answers(
    answers: &PlotAnswers,
    template: PipelineConfig,
) -> Result<PipelineConfig, AppError> {
    if answers.samples.is_empty() {
        return Err(AppError::config("No samples selected."));
    }
    if answers.branches.is_empty() {
        return Err(AppError::config("No branches selected."));
    }

    let cuts = CutSet::parse(&split_cut_text(&answers.cuts))?;
    let output_base = if answers.output.trim().is_empty() {
        template.output_base.clone()
    } else {
        clean_output_base(&answers.output)?
    };
    let y_branch = answers
        .y_branch
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(PipelineConfig {
        samples: answers.samples.clone(),
        branches: answers.branches.clone(),
        fit: template.fit && y_branch.is_none(),
        y_branch,
        cuts,
        output_base,
        ..template
    })
}
