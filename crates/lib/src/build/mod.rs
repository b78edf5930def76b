//! Build orchestration.
//!
//! For each package the orchestrator walks
//! `NotChecked -> Checking -> {Skip, Build} -> Recorded`:
//!
//! - **Checking** asks the indices the [`SkipExisting`] policy names whether
//!   the package already exists. Query failures count as "not found".
//! - **Skip** records the newest local artifact (if there is one) as
//!   `skipped` without running the builder.
//! - **Build** runs the external builder, recovers the artifact path from its
//!   output and records it as `built`.
//!
//! # Submodules
//!
//! - [`invocation`] - builder command line and recipe discovery
//! - [`output`] - artifact-path recovery from builder output

pub mod invocation;
pub mod output;
mod types;

pub use types::*;

use tracing::{info, warn};

use crate::config::Config;
use crate::manifest::{BuildRecord, BuildStatus, ManifestStore};
use crate::process::CommandRunner;
use crate::query::local::newest_artifact;
use crate::query::{Index, QueryService, RepositoryQueryResult};
use invocation::{build_command, discover_recipes, recipe_dir};
use output::{ArtifactReport, scan_build_output};

/// Lines of builder output kept in error messages.
const ERROR_TAIL_LINES: usize = 10;

/// Pure skip/build decision from the consulted indices.
///
/// `local` skips only on a local hit; `all` skips on any hit. Results from
/// indices the policy does not cover are ignored.
pub fn decide(policy: SkipExisting, checks: &[RepositoryQueryResult]) -> Decision {
  let skip = match policy {
    SkipExisting::None => false,
    SkipExisting::Local => checks.iter().any(|r| r.source_id == "local" && r.found),
    SkipExisting::All => checks.iter().any(|r| r.found),
  };
  if skip { Decision::Skip } else { Decision::Build }
}

/// Indices consulted under `policy`, in query order.
pub fn indices_for(config: &Config, policy: SkipExisting) -> Vec<Index> {
  match policy {
    SkipExisting::None => Vec::new(),
    SkipExisting::Local => vec![config.local_index()],
    SkipExisting::All => {
      let mut indices = vec![config.local_index(), config.public_index()];
      indices.extend(config.extra_indices());
      indices
    }
  }
}

/// Runs builds against one configuration and manifest.
pub struct Builder<'a, R> {
  runner: &'a R,
  config: &'a Config,
  store: ManifestStore,
}

impl<'a, R: CommandRunner> Builder<'a, R> {
  pub fn new(runner: &'a R, config: &'a Config) -> Self {
    Self {
      runner,
      config,
      store: ManifestStore::new(&config.manifest_path),
    }
  }

  pub fn with_store(mut self, store: ManifestStore) -> Self {
    self.store = store;
    self
  }

  pub fn store(&self) -> &ManifestStore {
    &self.store
  }

  /// Query every index the policy names.
  pub async fn check(&self, name: &str, options: &BuildOptions) -> Vec<RepositoryQueryResult> {
    let queries = QueryService::new(self.runner, &self.config.search_tool, self.config.query_timeout);
    let mut results = Vec::new();
    for index in indices_for(self.config, options.skip_existing) {
      let result = queries.query_index(name, None, &index, options.platform).await;
      if let Some(error) = &result.error {
        warn!(package = name, index = %result.source_id, %error, "query failed; treating as not found");
      }
      results.push(result);
    }
    results
  }

  /// Decide and, if needed, build one package.
  pub async fn build(&self, name: &str, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let recipe = recipe_dir(self.config, name)?;
    let platform = options.platform;
    info!(package = name, %platform, policy = %options.skip_existing, "checking package");

    let checks = self.check(name, options).await;
    let report = |outcome| BuildReport {
      package: name.to_string(),
      platform,
      policy: options.skip_existing,
      checks: checks.clone(),
      outcome,
    };

    if decide(options.skip_existing, &checks) == Decision::Skip {
      let found_in: Vec<String> = checks.iter().filter(|r| r.found).map(|r| r.source_id.clone()).collect();
      info!(package = name, %platform, found_in = ?found_in, "already available; skipping build");
      let record = self.record_local(name, options)?;
      return Ok(report(BuildOutcome::Skipped { record, found_in }));
    }

    let command = build_command(self.config, &recipe, options);
    if options.dry_run {
      return Ok(report(BuildOutcome::WouldBuild {
        command: command.to_string(),
      }));
    }

    info!(package = name, %platform, "building");
    let output = self.runner.run(&command).await.map_err(|source| BuildError::Spawn {
      tool: self.config.build_tool.clone(),
      package: name.to_string(),
      source,
    })?;
    let tail = || output.tail(ERROR_TAIL_LINES).join("\n");

    if !output.success() {
      return Err(BuildError::BuildTool {
        tool: self.config.build_tool.clone(),
        package: name.to_string(),
        platform,
        code: output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
        tail: tail(),
      });
    }

    let outcome = match scan_build_output(&output.text) {
      ArtifactReport::Written(path) => {
        if !path.is_file() {
          return Err(BuildError::ArtifactMissing {
            package: name.to_string(),
            path,
          });
        }
        let record = BuildRecord::from_artifact(&path, BuildStatus::Built)
          .map_err(|source| BuildError::Artifact { path, source })?;
        self.store.upsert(platform.as_str(), name, record.clone())?;
        BuildOutcome::Built { record }
      }
      ArtifactReport::SkipSignal => match self.record_local(name, options)? {
        Some(record) => BuildOutcome::Skipped {
          record: Some(record),
          found_in: vec!["builder".to_string()],
        },
        None => {
          return Err(BuildError::ParseRecovery {
            package: name.to_string(),
            platform,
            tail: tail(),
          });
        }
      },
      ArtifactReport::Unrecognized => {
        return Err(BuildError::ParseRecovery {
          package: name.to_string(),
          platform,
          tail: tail(),
        });
      }
    };

    Ok(report(outcome))
  }

  /// Build every package under the recipes directory, in name order.
  ///
  /// The first failure stops the batch unless `continue_on_error` is set.
  /// Only discovery errors are returned as `Err`.
  pub async fn build_all(&self, options: &BuildOptions, continue_on_error: bool) -> Result<BuildBatch, BuildError> {
    let names = discover_recipes(&self.config.recipes_dir)?;
    info!(count = names.len(), platform = %options.platform, "building all recipes");

    let mut batch = BuildBatch::new();
    let mut pending = names.into_iter();
    while let Some(name) = pending.next() {
      match self.build(&name, options).await {
        Ok(report) => batch.record_ok(&name, report),
        Err(e) => {
          warn!(package = %name, error = %e, "build failed");
          batch.record_err(&name, &e);
          if !continue_on_error {
            batch.abort(pending.by_ref());
            break;
          }
        }
      }
    }
    Ok(batch)
  }

  /// Record the newest local artifact as skipped. Dry runs only describe it.
  fn record_local(&self, name: &str, options: &BuildOptions) -> Result<Option<BuildRecord>, BuildError> {
    let Some(artifact) = newest_artifact(&self.config.output_dir, options.platform, name, None) else {
      return Ok(None);
    };
    let record = BuildRecord::from_artifact(&artifact.path, BuildStatus::Skipped).map_err(|source| {
      BuildError::Artifact {
        path: artifact.path.clone(),
        source,
      }
    })?;
    if !options.dry_run {
      self.store.upsert(options.platform.as_str(), name, record.clone())?;
    }
    Ok(Some(record))
  }
}
