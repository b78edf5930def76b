//! On-disk manifest with locked read-modify-write updates.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use super::types::{BuildRecord, Manifest};
use crate::consts::APP_NAME;
use crate::lock::{LockMode, ManifestLock, ManifestLockError};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("manifest {path} is not valid JSON: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to describe artifact {path}: {source}")]
  Artifact {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Lock(#[from] ManifestLockError),
}

/// A manifest entry whose artifact no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleEntry {
  pub platform: String,
  pub package: String,
  pub record: BuildRecord,
}

/// Handle on the manifest file.
///
/// Every method reads the file fresh; nothing is cached between calls, so
/// concurrent processes see each other's committed updates.
#[derive(Debug, Clone)]
pub struct ManifestStore {
  path: PathBuf,
  command: String,
}

impl ManifestStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      command: APP_NAME.to_string(),
    }
  }

  /// Command line recorded in the lock file while updating.
  pub fn with_command(mut self, command: impl Into<String>) -> Self {
    self.command = command.into();
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the whole manifest. An absent file is an empty manifest.
  pub fn load(&self) -> Result<Manifest, ManifestError> {
    if !self.path.exists() {
      return Ok(Manifest::new());
    }
    let _lock = ManifestLock::acquire(&self.path, LockMode::Shared, &self.command)?;
    read_manifest(&self.path)
  }

  pub fn get(&self, platform: &str, package: &str) -> Result<Option<BuildRecord>, ManifestError> {
    Ok(self.load()?.get(platform, package).cloned())
  }

  /// Run `f` on the current manifest under an exclusive lock and persist the
  /// result atomically.
  pub fn update<T>(&self, f: impl FnOnce(&mut Manifest) -> T) -> Result<T, ManifestError> {
    let _lock = ManifestLock::acquire(&self.path, LockMode::Exclusive, &self.command)?;
    let mut manifest = read_manifest(&self.path)?;
    let result = f(&mut manifest);
    write_manifest(&self.path, &manifest)?;
    Ok(result)
  }

  pub fn upsert(&self, platform: &str, package: &str, record: BuildRecord) -> Result<(), ManifestError> {
    let status = record.status;
    let filename = record.filename.clone();
    self.update(|manifest| {
      manifest.upsert(platform, package, record);
    })?;
    info!(platform, package, %status, artifact = %filename, "manifest updated");
    Ok(())
  }

  pub fn remove(&self, platform: &str, package: &str) -> Result<Option<BuildRecord>, ManifestError> {
    self.update(|manifest| manifest.remove(platform, package))
  }

  /// Find entries whose artifact is gone and, unless `dry_run`, drop them.
  pub fn cleanup(&self, platform: Option<&str>, dry_run: bool) -> Result<Vec<StaleEntry>, ManifestError> {
    let find_stale = |manifest: &Manifest| -> Vec<StaleEntry> {
      manifest
        .iter()
        .filter(|(p, _, record)| platform.is_none_or(|want| want == *p) && !record.artifact_exists())
        .map(|(p, name, record)| StaleEntry {
          platform: p.to_string(),
          package: name.to_string(),
          record: record.clone(),
        })
        .collect()
    };

    if dry_run {
      return Ok(find_stale(&self.load()?));
    }
    if !self.path.exists() {
      return Ok(Vec::new());
    }

    let stale = self.update(|manifest| {
      let stale = find_stale(manifest);
      for entry in &stale {
        manifest.remove(&entry.platform, &entry.package);
      }
      stale
    })?;
    if !stale.is_empty() {
      info!(removed = stale.len(), "dropped manifest entries with missing artifacts");
    }
    Ok(stale)
  }
}

fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Manifest::new()),
    Err(source) => {
      return Err(ManifestError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };
  if content.trim().is_empty() {
    return Ok(Manifest::new());
  }
  serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Write to a sibling temp file, then rename over the manifest.
fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
  let write_err = |source| ManifestError::Write {
    path: path.to_path_buf(),
    source,
  };

  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir).map_err(write_err)?;

  let mut content = serde_json::to_string_pretty(manifest).map_err(ManifestError::Serialize)?;
  content.push('\n');

  let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
  temp.write_all(content.as_bytes()).map_err(write_err)?;
  temp.as_file().sync_all().map_err(write_err)?;
  temp.persist(path).map_err(|e| write_err(e.error))?;

  debug!(path = %path.display(), bytes = content.len(), "manifest written");
  Ok(())
}
