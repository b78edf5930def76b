//! Recovery of the artifact path from builder output.
//!
//! The builder has no structured result channel; it reports the archive it
//! wrote with a log line like
//!
//! ```text
//! Archive written to '/out/linux-64/pwgen-2.08-h0.conda'
//! ```
//!
//! and mentions "skipping" when it decided on its own that the package
//! already exists. All knowledge of that text lives here.

use std::path::PathBuf;

const ARCHIVE_MARKER: &str = "Archive written to";
const SKIP_SIGNAL: &str = "skipping";

/// What the builder's output says about the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactReport {
  /// The builder reported writing this archive.
  Written(PathBuf),
  /// No archive line, but the builder skipped an existing package.
  SkipSignal,
  /// Neither; the outcome cannot be recovered from the text.
  Unrecognized,
}

/// Scan builder output for the last reported archive.
pub fn scan_build_output(text: &str) -> ArtifactReport {
  for line in text.lines().rev() {
    if let Some(path) = archive_path(line) {
      return ArtifactReport::Written(path);
    }
  }
  if text.lines().any(|line| line.to_lowercase().contains(SKIP_SIGNAL)) {
    return ArtifactReport::SkipSignal;
  }
  ArtifactReport::Unrecognized
}

fn archive_path(line: &str) -> Option<PathBuf> {
  let (_, rest) = line.split_once(ARCHIVE_MARKER)?;
  let path = rest
    .trim()
    .trim_start_matches(':')
    .trim()
    .trim_matches(|c| c == '\'' || c == '"' || c == '`');
  if path.is_empty() {
    return None;
  }
  Some(PathBuf::from(path))
}
