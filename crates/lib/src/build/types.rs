use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::BatchReport;
use crate::manifest::{BuildRecord, ManifestError};
use crate::platform::Platform;
use crate::query::RepositoryQueryResult;

/// Which indices count as "already available".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipExisting {
  /// Always build.
  None,
  /// Skip when the output directory already holds the package.
  Local,
  /// Skip when any consulted index holds it.
  #[default]
  All,
}

impl SkipExisting {
  pub const ALL: [SkipExisting; 3] = [SkipExisting::None, SkipExisting::Local, SkipExisting::All];

  pub fn as_str(&self) -> &'static str {
    match self {
      SkipExisting::None => "none",
      SkipExisting::Local => "local",
      SkipExisting::All => "all",
    }
  }
}

impl fmt::Display for SkipExisting {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SkipExisting {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_lowercase();
    SkipExisting::ALL
      .into_iter()
      .find(|policy| policy.as_str() == wanted)
      .ok_or_else(|| {
        let expected: Vec<&str> = SkipExisting::ALL.iter().map(SkipExisting::as_str).collect();
        format!("unknown skip policy '{}', expected one of: {}", wanted, expected.join(", "))
      })
  }
}

/// Outcome of the checking phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Build,
  Skip,
}

/// Per-invocation build settings.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub platform: Platform,
  pub skip_existing: SkipExisting,
  /// Pass `--no-test` to the builder.
  pub no_test: bool,
  /// Pass `-v` to the builder.
  pub verbose: bool,
  /// Check only; never run the builder or touch the manifest.
  pub dry_run: bool,
}

impl BuildOptions {
  pub fn new(platform: Platform) -> Self {
    Self {
      platform,
      skip_existing: SkipExisting::default(),
      no_test: false,
      verbose: false,
      dry_run: false,
    }
  }

  pub fn with_skip_existing(mut self, policy: SkipExisting) -> Self {
    self.skip_existing = policy;
    self
  }

  /// Build unconditionally.
  pub fn forced(self) -> Self {
    self.with_skip_existing(SkipExisting::None)
  }

  pub fn with_dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BuildOutcome {
  /// The builder produced a new artifact.
  Built { record: BuildRecord },
  /// Nothing was built. `record` is `None` when the package only exists
  /// remotely, so there is nothing local to record.
  Skipped {
    record: Option<BuildRecord>,
    found_in: Vec<String>,
  },
  /// Dry run: the builder would have been invoked with `command`.
  WouldBuild { command: String },
}

/// Everything known about one package after `build`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
  pub package: String,
  pub platform: Platform,
  pub policy: SkipExisting,
  pub checks: Vec<RepositoryQueryResult>,
  pub outcome: BuildOutcome,
}

pub type BuildBatch = BatchReport<BuildReport>;

impl BatchReport<BuildReport> {
  pub fn built(&self) -> usize {
    self
      .outcomes()
      .filter(|r| matches!(r.outcome, BuildOutcome::Built { .. }))
      .count()
  }

  pub fn would_build(&self) -> usize {
    self
      .outcomes()
      .filter(|r| matches!(r.outcome, BuildOutcome::WouldBuild { .. }))
      .count()
  }

  pub fn skipped(&self) -> usize {
    self
      .outcomes()
      .filter(|r| matches!(r.outcome, BuildOutcome::Skipped { .. }))
      .count()
  }
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("recipes directory {path} does not exist (set PKGCTL_RECIPES_DIR)")]
  RecipesDirMissing { path: PathBuf },

  #[error("no recipe for '{package}': expected {path}")]
  RecipeNotFound { package: String, path: PathBuf },

  #[error("failed to run {tool} for '{package}': {source}")]
  Spawn {
    tool: String,
    package: String,
    #[source]
    source: io::Error,
  },

  #[error("{tool} failed for '{package}' on {platform} (exit {code}):\n{tail}")]
  BuildTool {
    tool: String,
    package: String,
    platform: Platform,
    code: String,
    tail: String,
  },

  #[error("builder reported {path} for '{package}' but the file does not exist")]
  ArtifactMissing { package: String, path: PathBuf },

  #[error(
    "could not determine the artifact for '{package}' on {platform} from builder output\n\
     last output:\n{tail}"
  )]
  ParseRecovery {
    package: String,
    platform: Platform,
    tail: String,
  },

  #[error("failed to describe artifact {path}: {source}")]
  Artifact {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to scan recipes in {path}: {source}")]
  Discover {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

impl BuildError {
  /// Errors that stem from setup rather than from the builder.
  pub fn is_configuration(&self) -> bool {
    matches!(self, BuildError::RecipesDirMissing { .. } | BuildError::RecipeNotFound { .. })
  }
}
