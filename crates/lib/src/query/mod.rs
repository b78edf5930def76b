//! Repository queries: does a package version already exist somewhere?
//!
//! Each call asks exactly one [`Index`] and normalizes the answer into a
//! [`RepositoryQueryResult`]. Failures are part of the result (`found = false`
//! plus an `error` annotation), never an `Err`, so callers can combine several
//! indices without special-casing unreachable ones. There are no retries.

pub mod local;
pub mod search_output;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

pub use search_output::{MAX_SAMPLE_MATCHES, SampleMatch};

use crate::platform::Platform;
use crate::process::{CommandRunner, CommandSpec};

/// A place that may already hold a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
  /// The builder's output directory.
  Local { root: PathBuf },
  /// A conda channel reachable by the search tool (name or URL).
  Channel { id: String, channel: String },
  /// An object-storage-backed channel (`s3://bucket/channel`).
  ObjectStorage { id: String, url: String },
}

impl Index {
  pub fn id(&self) -> &str {
    match self {
      Index::Local { .. } => "local",
      Index::Channel { id, .. } | Index::ObjectStorage { id, .. } => id,
    }
  }
}

/// Normalized answer from one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryQueryResult {
  pub source_id: String,
  pub found: bool,
  pub match_count: usize,
  pub sample_matches: Vec<SampleMatch>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl RepositoryQueryResult {
  fn failed(source_id: &str, error: String) -> Self {
    Self {
      source_id: source_id.to_string(),
      found: false,
      match_count: 0,
      sample_matches: Vec::new(),
      error: Some(error),
    }
  }

  fn from_matches(source_id: &str, count: usize, mut samples: Vec<SampleMatch>) -> Self {
    samples.truncate(MAX_SAMPLE_MATCHES);
    Self {
      source_id: source_id.to_string(),
      found: count > 0,
      match_count: count,
      sample_matches: samples,
      error: None,
    }
  }
}

/// Runs queries through a search tool for remote indices.
pub struct QueryService<'a, R> {
  runner: &'a R,
  search_tool: String,
  timeout: Duration,
}

impl<'a, R: CommandRunner> QueryService<'a, R> {
  pub fn new(runner: &'a R, search_tool: impl Into<String>, timeout: Duration) -> Self {
    Self {
      runner,
      search_tool: search_tool.into(),
      timeout,
    }
  }

  /// The search invocation for one package on one channel.
  pub fn search_command(&self, name: &str, version: Option<&str>, channel: &str, platform: Platform) -> CommandSpec {
    let spec = match version {
      Some(v) => format!("{}=={}", name, v),
      None => name.to_string(),
    };
    CommandSpec::new(&self.search_tool)
      .args(["search", "--override-channels", "--channel", channel])
      .args(["--platform", platform.as_str()])
      .arg(spec)
      .timeout(self.timeout)
  }

  /// Ask `index` whether `name` (optionally at `version`) exists for `platform`.
  pub async fn query_index(
    &self,
    name: &str,
    version: Option<&str>,
    index: &Index,
    platform: Platform,
  ) -> RepositoryQueryResult {
    let result = match index {
      Index::Local { root } => query_local(name, version, root, platform),
      Index::Channel { id, channel } => self.query_remote(name, version, id, channel, platform).await,
      Index::ObjectStorage { id, url } => self.query_remote(name, version, id, url, platform).await,
    };
    debug!(
      package = name,
      index = %result.source_id,
      found = result.found,
      matches = result.match_count,
      "index queried"
    );
    result
  }

  async fn query_remote(
    &self,
    name: &str,
    version: Option<&str>,
    id: &str,
    channel: &str,
    platform: Platform,
  ) -> RepositoryQueryResult {
    let command = self.search_command(name, version, channel, platform);
    let output = match self.runner.run(&command).await {
      Ok(output) => output,
      Err(e) => {
        warn!(package = name, index = id, error = %e, "search could not run");
        return RepositoryQueryResult::failed(id, format!("{} search failed: {}", self.search_tool, e));
      }
    };

    if !output.success() {
      let detail = output.tail(1).first().map(|l| l.trim().to_string()).unwrap_or_default();
      return RepositoryQueryResult::failed(
        id,
        format!("{} search exited with {:?}: {}", self.search_tool, output.code, detail),
      );
    }

    let matches = search_output::parse_search_output(name, &output.text);
    RepositoryQueryResult::from_matches(id, matches.count, matches.samples)
  }
}

fn query_local(name: &str, version: Option<&str>, root: &std::path::Path, platform: Platform) -> RepositoryQueryResult {
  match local::local_artifacts(root, platform, name, version) {
    Ok(artifacts) => {
      if artifacts.len() > 1 {
        warn!(
          package = name,
          count = artifacts.len(),
          newest = %artifacts[0].path.display(),
          "multiple local artifacts match"
        );
      }
      let count = artifacts.len();
      let samples = artifacts.into_iter().map(|a| a.parsed).collect();
      RepositoryQueryResult::from_matches("local", count, samples)
    }
    Err(e) => RepositoryQueryResult::failed("local", format!("listing {}: {}", root.display(), e)),
  }
}
