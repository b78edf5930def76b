//! Artifacts already present in the builder's output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use super::search_output::SampleMatch;
use crate::consts::ARCHIVE_EXTENSIONS;
use crate::platform::Platform;

/// An archive found under `<root>/<platform>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
  pub path: PathBuf,
  pub modified: SystemTime,
  pub parsed: SampleMatch,
}

/// Split `<name>-<version>-<build>.<ext>` into version and build.
///
/// Returns `None` for files of other packages that share the prefix, such as
/// `pwgen-extra-1.0-h0.conda` when looking for `pwgen`.
pub fn parse_artifact_filename(name: &str, filename: &str) -> Option<SampleMatch> {
  let stem = ARCHIVE_EXTENSIONS.iter().find_map(|ext| filename.strip_suffix(ext))?;
  let rest = stem.strip_prefix(name)?.strip_prefix('-')?;
  let (version, build) = rest.split_once('-')?;
  if version.is_empty() || build.is_empty() || build.contains('-') {
    return None;
  }
  Some(SampleMatch {
    version: version.to_string(),
    build_identifier: build.to_string(),
  })
}

/// List archives of `name` (optionally pinned to `version`), newest first.
///
/// A missing platform directory is an empty result, not an error.
pub fn local_artifacts(
  root: &Path,
  platform: Platform,
  name: &str,
  version: Option<&str>,
) -> io::Result<Vec<LocalArtifact>> {
  let dir = root.join(platform.as_str());
  let entries = match fs::read_dir(&dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(e),
  };

  let mut found = Vec::new();
  for entry in entries {
    let entry = entry?;
    let Ok(metadata) = entry.metadata() else { continue };
    if !metadata.is_file() {
      continue;
    }
    let Some(filename) = entry.file_name().to_str().map(String::from) else {
      continue;
    };
    let Some(parsed) = parse_artifact_filename(name, &filename) else {
      continue;
    };
    if version.is_some_and(|v| v != parsed.version) {
      continue;
    }
    found.push(LocalArtifact {
      path: entry.path(),
      modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
      parsed,
    });
  }

  found.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
  Ok(found)
}

/// The newest local archive for `name`, if any.
///
/// Several candidates are resolved by modification time with a diagnostic.
pub fn newest_artifact(root: &Path, platform: Platform, name: &str, version: Option<&str>) -> Option<LocalArtifact> {
  let artifacts = match local_artifacts(root, platform, name, version) {
    Ok(artifacts) => artifacts,
    Err(e) => {
      warn!(package = name, platform = %platform, error = %e, "could not list local artifacts");
      return None;
    }
  };
  if artifacts.len() > 1 {
    warn!(
      package = name,
      platform = %platform,
      count = artifacts.len(),
      chosen = %artifacts[0].path.display(),
      "multiple local artifacts match; using the most recently modified"
    );
  }
  artifacts.into_iter().next()
}
