//! Removing published versions from a remote channel.
//!
//! A retraction names one package and one or more versions. Each version is
//! deleted independently: a denied or failed deletion is reported for that
//! version and the remaining versions are still attempted.

mod target;
mod versions;

pub use target::{RetractTarget, classify_http, classify_s3};
pub use versions::{canonical_filename, parse_version_spec};

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credentials::{Credential, CredentialResolver, bucket_of};
use crate::platform::Platform;
use crate::process::CommandRunner;
use crate::publish::PublishMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum VersionOutcome {
  Deleted,
  /// Nothing to delete. Treated as success.
  AlreadyGone,
  AuthDenied { detail: String },
  Failed { detail: String },
  /// Dry run: the deletion that would have been performed.
  DryRun { action: String },
}

impl VersionOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(self, VersionOutcome::AuthDenied { .. } | VersionOutcome::Failed { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResult {
  pub version: String,
  pub filename: String,
  pub outcome: VersionOutcome,
  /// Follow-up the operator has to do, such as re-indexing a channel.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractReport {
  pub package: String,
  pub platform: Platform,
  pub target: RetractTarget,
  pub dry_run: bool,
  pub versions: Vec<VersionResult>,
}

impl RetractReport {
  pub fn deleted(&self) -> usize {
    self
      .versions
      .iter()
      .filter(|v| v.outcome == VersionOutcome::Deleted)
      .count()
  }

  pub fn already_gone(&self) -> usize {
    self
      .versions
      .iter()
      .filter(|v| v.outcome == VersionOutcome::AlreadyGone)
      .count()
  }

  pub fn failures(&self) -> usize {
    self.versions.iter().filter(|v| v.outcome.is_failure()).count()
  }
}

/// What to retract.
#[derive(Debug, Clone)]
pub struct RetractRequest {
  pub package: String,
  /// Version spec as typed by the user; see [`parse_version_spec`].
  pub versions: String,
  pub platform: Platform,
  /// Archive extension, `conda` unless overridden.
  pub ext: String,
  pub dry_run: bool,
}

impl RetractRequest {
  pub fn new(package: impl Into<String>, versions: impl Into<String>, platform: Platform) -> Self {
    Self {
      package: package.into(),
      versions: versions.into(),
      platform,
      ext: "conda".to_string(),
      dry_run: false,
    }
  }
}

#[derive(Debug, Error)]
pub enum RetractError {
  #[error("no versions given in '{spec}'; use 1.0.0, 1.0.0,1.1.0 or 1.0.0-1.2.0")]
  NoVersions { spec: String },

  #[error("no credential for {remote}; {hint}")]
  MissingCredential { remote: String, hint: &'static str },

  #[error("object-storage retraction needs a bucket: set PKGCTL_S3_CHANNEL to s3://bucket/channel")]
  MissingBucket,

  #[error("failed to set up HTTP client: {0}")]
  HttpClient(#[source] reqwest::Error),
}

impl RetractTarget {
  /// Resolve a target for `channel` from configuration. Object storage uses
  /// the bucket of the configured `s3://bucket/channel` URL.
  pub fn from_config(method: PublishMethod, config: &Config, channel: &str) -> Result<Self, RetractError> {
    match method {
      PublishMethod::Token => Ok(RetractTarget::Token {
        server: config.prefix_url.clone(),
        channel: channel.to_string(),
      }),
      PublishMethod::ObjectStorage => {
        let url = config.s3_channel.as_deref().ok_or(RetractError::MissingBucket)?;
        let bucket = bucket_of(url).ok_or(RetractError::MissingBucket)?;
        Ok(RetractTarget::ObjectStorage {
          bucket_url: format!("s3://{}", bucket),
          channel: channel.to_string(),
          endpoint_url: config.s3_endpoint.clone(),
        })
      }
    }
  }
}

/// Deletes versions from a remote channel.
pub struct Retractor<'a, R> {
  runner: &'a R,
  config: &'a Config,
  credentials: &'a CredentialResolver,
  http: reqwest::Client,
}

impl<'a, R: CommandRunner> Retractor<'a, R> {
  pub fn new(runner: &'a R, config: &'a Config, credentials: &'a CredentialResolver) -> Result<Self, RetractError> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("pkgctl/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(RetractError::HttpClient)?;
    Ok(Self {
      runner,
      config,
      credentials,
      http,
    })
  }

  /// Retract every version in the request.
  ///
  /// `Err` is returned only before any deletion is attempted.
  pub async fn retract(&self, request: &RetractRequest, target: &RetractTarget) -> Result<RetractReport, RetractError> {
    let versions = parse_version_spec(&request.versions);
    if versions.is_empty() {
      return Err(RetractError::NoVersions {
        spec: request.versions.clone(),
      });
    }

    let remote = target.remote();
    let credential = self.credentials.resolve(&remote);
    if credential.is_none() && !request.dry_run {
      return Err(RetractError::MissingCredential {
        remote: remote.base_url,
        hint: match target {
          RetractTarget::Token { .. } => "set PREFIX_API_KEY or add a token to the auth file",
          RetractTarget::ObjectStorage { .. } => "set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY",
        },
      });
    }

    info!(
      package = %request.package,
      platform = %request.platform,
      target = %target,
      versions = ?versions,
      dry_run = request.dry_run,
      "retracting"
    );

    let mut results = Vec::with_capacity(versions.len());
    for version in versions {
      let filename = canonical_filename(&request.package, &version, request.platform, &request.ext);
      let (outcome, note) = match &credential {
        _ if request.dry_run => (
          VersionOutcome::DryRun {
            action: target.describe_delete(&self.config.s3_tool, request.platform, &filename),
          },
          None,
        ),
        Some(credential) => self.delete_one(target, credential, request.platform, &filename).await,
        None => (
          VersionOutcome::AuthDenied {
            detail: "no credential".to_string(),
          },
          None,
        ),
      };

      match &outcome {
        VersionOutcome::AuthDenied { detail } | VersionOutcome::Failed { detail } => {
          warn!(package = %request.package, %version, %detail, "retraction failed for version")
        }
        other => debug!(package = %request.package, %version, outcome = ?other, "version processed"),
      }
      results.push(VersionResult {
        version,
        filename,
        outcome,
        note,
      });
    }

    Ok(RetractReport {
      package: request.package.clone(),
      platform: request.platform,
      target: target.clone(),
      dry_run: request.dry_run,
      versions: results,
    })
  }

  async fn delete_one(
    &self,
    target: &RetractTarget,
    credential: &Credential,
    platform: Platform,
    filename: &str,
  ) -> (VersionOutcome, Option<String>) {
    match target {
      RetractTarget::Token { .. } => (self.delete_http(target, credential, platform, filename).await, None),
      RetractTarget::ObjectStorage { .. } => self.delete_object(target, credential, platform, filename).await,
    }
  }

  async fn delete_http(
    &self,
    target: &RetractTarget,
    credential: &Credential,
    platform: Platform,
    filename: &str,
  ) -> VersionOutcome {
    let Some(url) = target.delete_url(platform, filename) else {
      return VersionOutcome::Failed {
        detail: "target has no delete endpoint".to_string(),
      };
    };
    let Credential::Bearer(token) = credential else {
      return VersionOutcome::AuthDenied {
        detail: "token server needs a bearer token, found access keys".to_string(),
      };
    };

    debug!(%url, "sending delete request");
    match self.http.delete(&url).bearer_auth(token).send().await {
      Ok(response) => {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        classify_http(status, &body)
      }
      Err(e) => VersionOutcome::Failed {
        detail: format!("request to {} failed: {}", url, e),
      },
    }
  }

  async fn delete_object(
    &self,
    target: &RetractTarget,
    credential: &Credential,
    platform: Platform,
    filename: &str,
  ) -> (VersionOutcome, Option<String>) {
    let remote = target.remote();
    let env = credential.child_env(&remote);
    let Some(object) = target.object_url(platform, filename) else {
      return (
        VersionOutcome::Failed {
          detail: "target has no object URL".to_string(),
        },
        None,
      );
    };

    let mut rm = target.s3_command(&self.config.s3_tool, "rm", &[object.as_str()]);
    for (key, value) in &env {
      rm = rm.env(key.as_str(), value.as_str());
    }
    let outcome = match self.runner.run(&rm).await {
      Ok(output) => classify_s3(&output),
      Err(e) => VersionOutcome::Failed {
        detail: format!("failed to run {}: {}", self.config.s3_tool, e),
      },
    };
    if outcome != VersionOutcome::Deleted {
      return (outcome, None);
    }

    let note = self.refresh_repodata(target, &env, platform, filename).await;
    (outcome, Some(note))
  }

  /// Fetch the subdir's `repodata.json` into a scratch directory so the
  /// operator knows the index still lists the deleted file.
  async fn refresh_repodata(
    &self,
    target: &RetractTarget,
    env: &[(String, String)],
    platform: Platform,
    filename: &str,
  ) -> String {
    let scratch = match TempDir::new() {
      Ok(dir) => dir,
      Err(e) => return format!("could not create a scratch directory for repodata.json: {}", e),
    };
    let Some(source) = target.object_url(platform, "repodata.json") else {
      return String::new();
    };
    let dest = scratch.path().join("repodata.json");
    let dest_arg = dest.to_string_lossy();

    let mut cp = target.s3_command(&self.config.s3_tool, "cp", &[source.as_str(), dest_arg.as_ref()]);
    for (key, value) in env {
      cp = cp.env(key.as_str(), value.as_str());
    }

    let note = match self.runner.run(&cp).await {
      Ok(output) if output.success() => {
        let listed = std::fs::read_to_string(&dest)
          .map(|text| text.contains(filename))
          .unwrap_or(false);
        if listed {
          format!(
            "{} still lists {}; re-index the channel to drop it",
            source, filename
          )
        } else {
          format!("fetched {}; re-index the channel to publish the change", source)
        }
      }
      Ok(output) => format!(
        "could not fetch {} (exit {:?}); re-index the channel",
        source, output.code
      ),
      Err(e) => format!("could not fetch {}: {}; re-index the channel", source, e),
    };
    debug!(scratch = %scratch.path().display(), "removing repodata scratch directory");
    note
  }
}
