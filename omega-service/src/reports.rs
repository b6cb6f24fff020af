//! Text context drawn from uploaded reports.
//!
//! Only plain-text formats are read; PDFs and images are left to the model
//! provider and skipped here.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Extensions read as UTF-8 report text
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "csv", "json"];

/// A text report read from the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub name: String,
    pub text: String,
}

/// Reads text-like reports from the upload directory
#[derive(Debug, Clone)]
pub struct ReportLibrary {
    dir: PathBuf,
}

impl ReportLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// All readable text reports, ordered by file name
    pub async fn text_reports(&self) -> Vec<Report> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Upload directory not readable");
                return Vec::new();
            }
        };

        let mut paths = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let is_file = entry
                        .file_type()
                        .await
                        .map(|t| t.is_file())
                        .unwrap_or(false);
                    if is_file && has_text_extension(&path) {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Failed to list upload directory");
                    break;
                }
            }
        }
        paths.sort();

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => reports.push(Report {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    text,
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable report");
                }
            }
        }
        reports
    }

    /// Reports rendered as one context block, cut at `max_chars` characters.
    ///
    /// Returns `None` when there is nothing to send.
    pub async fn context(&self, max_chars: usize) -> Option<String> {
        let reports = self.text_reports().await;
        let rendered = render_context(&reports, max_chars);
        (!rendered.is_empty()).then_some(rendered)
    }
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn render_context(reports: &[Report], max_chars: usize) -> String {
    let mut context = String::new();
    for report in reports {
        context.push_str("### ");
        context.push_str(&report.name);
        context.push('\n');
        context.push_str(report.text.trim());
        context.push_str("\n\n");
    }

    match context.char_indices().nth(max_chars) {
        Some((cut, _)) => context[..cut].to_string(),
        None => context.trim_end().to_string(),
    }
}
