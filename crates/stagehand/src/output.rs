//! Writing the images shown during a pass and printing pass summaries.

use std::path::{Path, PathBuf};

use stagehand_pipeline::PassDiagnostics;
use stagehand_pipeline::diagnostics::FrameSummary;
use stagehand_pipeline::headless::{Panel, Widget};

use crate::error::CliError;

/// Reduce a caption to a file-name friendly slug.
pub fn slug(caption: &str) -> String {
    let mut out = String::with_capacity(caption.len());
    for c in caption.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// File name for the `index`-th image of the `panel`-th container.
pub fn image_path(dir: &Path, panel: usize, image: usize, caption: &str) -> PathBuf {
    dir.join(format!("{panel:02}-{image}-{}.png", slug(caption)))
}

/// Write every shown image as PNG under `dir`, returning the paths in
/// display order.
///
/// # Errors
///
/// Returns [`CliError::Io`] if `dir` cannot be created and
/// [`CliError::Encode`] if an image cannot be written.
pub fn write_panels(dir: &Path, panels: &[Panel]) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;
    let mut written = Vec::new();
    for (p, panel) in panels.iter().enumerate() {
        for (i, shown) in panel.images.iter().enumerate() {
            let path = image_path(dir, p, i, &shown.caption);
            shown
                .frame
                .to_display()
                .save(&path)
                .map_err(|source| CliError::Encode {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), "wrote image");
            written.push(path);
        }
    }
    Ok(written)
}

/// One line per shown image: caption and frame shape.
pub fn describe_panels(panels: &[Panel]) -> String {
    panels
        .iter()
        .flat_map(|panel| {
            panel
                .images
                .iter()
                .map(|shown| format!("{:<32} {}", shown.caption, FrameSummary::of(&shown.frame)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per control: identity, value, domain and help.
pub fn describe_widgets(widgets: &[Widget]) -> String {
    widgets
        .iter()
        .map(|w| {
            let line = format!("{:<28} = {:<16} [{}]", w.key, w.value.to_string(), w.domain);
            match &w.help {
                Some(help) => format!("{line}  {help}"),
                None => line,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Diagnostics as pretty JSON or the human-readable report.
///
/// # Errors
///
/// Returns [`CliError::Json`] if serialization fails.
pub fn format_diagnostics(diagnostics: &PassDiagnostics, json: bool) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(diagnostics)?)
    } else {
        Ok(diagnostics.report())
    }
}
