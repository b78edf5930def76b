use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::util::rfc3339;

/// Terminal outcome of one build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
  Built,
  Skipped,
}

impl fmt::Display for BuildStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildStatus::Built => f.write_str("built"),
      BuildStatus::Skipped => f.write_str("skipped"),
    }
  }
}

/// What the manifest knows about the artifact of one `(platform, package)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
  pub artifact_path: PathBuf,
  pub filename: String,
  pub size_bytes: u64,
  /// Artifact modification time, RFC 3339.
  pub last_modified: String,
  /// When the outcome was recorded. For skipped records this is the
  /// artifact's modification time so repeated skips produce the same record.
  pub built_at: String,
  pub status: BuildStatus,
}

impl BuildRecord {
  /// Describe an artifact on disk.
  pub fn from_artifact(path: &Path, status: BuildStatus) -> io::Result<Self> {
    let metadata = fs::metadata(path)?;
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let built_at = match status {
      BuildStatus::Built => SystemTime::now(),
      BuildStatus::Skipped => modified,
    };
    let filename = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    Ok(Self {
      artifact_path: path.to_path_buf(),
      filename,
      size_bytes: metadata.len(),
      last_modified: rfc3339(modified),
      built_at: rfc3339(built_at),
      status,
    })
  }

  pub fn artifact_exists(&self) -> bool {
    self.artifact_path.is_file()
  }
}

/// `platform -> package -> BuildRecord`, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
  entries: BTreeMap<String, BTreeMap<String, BuildRecord>>,
}

impl Manifest {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, platform: &str, package: &str) -> Option<&BuildRecord> {
    self.entries.get(platform)?.get(package)
  }

  /// Insert or replace the record for `(platform, package)`.
  pub fn upsert(&mut self, platform: &str, package: &str, record: BuildRecord) -> Option<BuildRecord> {
    self
      .entries
      .entry(platform.to_string())
      .or_default()
      .insert(package.to_string(), record)
  }

  pub fn remove(&mut self, platform: &str, package: &str) -> Option<BuildRecord> {
    let packages = self.entries.get_mut(platform)?;
    let removed = packages.remove(package);
    if packages.is_empty() {
      self.entries.remove(platform);
    }
    removed
  }

  /// Records for one platform, sorted by package name.
  pub fn packages(&self, platform: &str) -> impl Iterator<Item = (&str, &BuildRecord)> {
    self
      .entries
      .get(platform)
      .into_iter()
      .flat_map(|packages| packages.iter().map(|(name, record)| (name.as_str(), record)))
  }

  /// Every `(platform, package, record)`, sorted.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &BuildRecord)> {
    self.entries.iter().flat_map(|(platform, packages)| {
      packages
        .iter()
        .map(move |(name, record)| (platform.as_str(), name.as_str(), record))
    })
  }

  pub fn platforms(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.values().map(BTreeMap::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
