//! Publishing built artifacts to remote channels.
//!
//! Publishing is driven by the manifest: only packages with a record for the
//! requested platform can be published, and the recorded artifact must still
//! exist. Uploads go through the builder's `upload` subcommand.

mod target;

pub use target::{MAX_FAILURE_LINES, PublishMethod, PublishTarget};

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::batch::BatchReport;
use crate::config::Config;
use crate::credentials::CredentialResolver;
use crate::manifest::{ManifestError, ManifestStore};
use crate::platform::Platform;
use crate::process::CommandRunner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PublishOutcome {
  Published,
  /// The destination already holds this artifact. Treated as success.
  AlreadyExists,
  Failed { reason: String, lines: Vec<String> },
  /// Dry run: the upload that would have run.
  DryRun { command: String },
}

impl PublishOutcome {
  pub fn is_success(&self) -> bool {
    !matches!(self, PublishOutcome::Failed { .. })
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
  pub package: String,
  pub platform: Platform,
  pub artifact: PathBuf,
  pub target: PublishTarget,
  /// No credential was found; the upload relied on the tool's own auth.
  pub credential_missing: bool,
  pub outcome: PublishOutcome,
}

pub type PublishBatch = BatchReport<PublishReport>;

impl BatchReport<PublishReport> {
  pub fn published(&self) -> usize {
    self
      .outcomes()
      .filter(|r| r.outcome == PublishOutcome::Published)
      .count()
  }

  pub fn already_exists(&self) -> usize {
    self
      .outcomes()
      .filter(|r| r.outcome == PublishOutcome::AlreadyExists)
      .count()
  }
}

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("'{package}' has not been built for {platform}; run `pkgctl build {package} --platform {platform}` first")]
  NotBuilt { package: String, platform: Platform },

  #[error(
    "manifest entry for '{package}' on {platform} points to {path}, which no longer exists; \
     run `pkgctl build {package} --platform {platform} --force` to rebuild"
  )]
  StaleManifest {
    package: String,
    platform: Platform,
    path: PathBuf,
  },

  #[error("no channel configured for {method} publishing: {hint}")]
  MissingChannel { method: PublishMethod, hint: &'static str },

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

impl PublishTarget {
  /// Resolve a target from configuration. `channel` overrides the configured
  /// token channel, or the whole `s3://` URL for object storage.
  pub fn from_config(method: PublishMethod, config: &Config, channel: Option<&str>) -> Result<Self, PublishError> {
    match method {
      PublishMethod::Token => {
        let channel = channel
          .map(String::from)
          .or_else(|| config.publish_channel.clone())
          .ok_or(PublishError::MissingChannel {
            method,
            hint: "pass --channel or set PKGCTL_PUBLISH_CHANNEL",
          })?;
        Ok(PublishTarget::Token {
          server: config.prefix_url.clone(),
          channel,
        })
      }
      PublishMethod::ObjectStorage => {
        let channel_url = channel
          .map(String::from)
          .or_else(|| config.s3_channel.clone())
          .ok_or(PublishError::MissingChannel {
            method,
            hint: "pass --channel s3://bucket/channel or set PKGCTL_S3_CHANNEL",
          })?;
        Ok(PublishTarget::ObjectStorage {
          channel_url,
          endpoint_url: config.s3_endpoint.clone(),
          region: config.s3_region.clone(),
        })
      }
    }
  }
}

/// Uploads artifacts recorded in the manifest.
pub struct Publisher<'a, R> {
  runner: &'a R,
  config: &'a Config,
  credentials: &'a CredentialResolver,
  store: ManifestStore,
}

impl<'a, R: CommandRunner> Publisher<'a, R> {
  pub fn new(runner: &'a R, config: &'a Config, credentials: &'a CredentialResolver) -> Self {
    Self {
      runner,
      config,
      credentials,
      store: ManifestStore::new(&config.manifest_path),
    }
  }

  /// Publish the recorded artifact of `name` for `platform`.
  ///
  /// An upload that runs but fails is `Ok` with [`PublishOutcome::Failed`];
  /// `Err` means the request could not be attempted.
  pub async fn publish(
    &self,
    name: &str,
    target: &PublishTarget,
    platform: Platform,
    dry_run: bool,
  ) -> Result<PublishReport, PublishError> {
    let record = self
      .store
      .get(platform.as_str(), name)?
      .ok_or_else(|| PublishError::NotBuilt {
        package: name.to_string(),
        platform,
      })?;
    if !record.artifact_exists() {
      return Err(PublishError::StaleManifest {
        package: name.to_string(),
        platform,
        path: record.artifact_path,
      });
    }

    let remote = target.remote();
    let credential = self.credentials.resolve(&remote);
    if credential.is_none() {
      warn!(
        package = name,
        remote = %remote.base_url,
        "no credential found; relying on the upload tool's own authentication"
      );
    }

    let mut command = target.upload_command(&self.config.build_tool, &record.artifact_path);
    if let Some(credential) = &credential {
      for (key, value) in credential.child_env(&remote) {
        command = command.env(key, value);
      }
    }

    let report = |outcome| PublishReport {
      package: name.to_string(),
      platform,
      artifact: record.artifact_path.clone(),
      target: target.clone(),
      credential_missing: credential.is_none(),
      outcome,
    };

    if dry_run {
      return Ok(report(PublishOutcome::DryRun {
        command: command.to_string(),
      }));
    }

    info!(package = name, %platform, target = %target, artifact = %record.filename, "uploading");
    let outcome = match self.runner.run(&command).await {
      Ok(output) => target.classify(&output),
      Err(e) => PublishOutcome::Failed {
        reason: format!("failed to run {}: {}", self.config.build_tool, e),
        lines: Vec::new(),
      },
    };
    match &outcome {
      PublishOutcome::Published => info!(package = name, target = %target, "published"),
      PublishOutcome::AlreadyExists => info!(package = name, target = %target, "already present at destination"),
      PublishOutcome::Failed { reason, .. } => warn!(package = name, target = %target, %reason, "upload failed"),
      PublishOutcome::DryRun { .. } => {}
    }
    Ok(report(outcome))
  }

  /// Publish every package recorded for `platform`, in name order.
  pub async fn publish_all(
    &self,
    target: &PublishTarget,
    platform: Platform,
    continue_on_error: bool,
    dry_run: bool,
  ) -> Result<PublishBatch, PublishError> {
    let manifest = self.store.load()?;
    let names: Vec<String> = manifest.packages(platform.as_str()).map(|(n, _)| n.to_string()).collect();
    info!(count = names.len(), %platform, target = %target, "publishing all recorded packages");

    let mut batch = PublishBatch::new();
    let mut pending = names.into_iter();
    while let Some(name) = pending.next() {
      let failure = match self.publish(&name, target, platform, dry_run).await {
        Ok(report) => {
          let failed_detail = match &report.outcome {
            PublishOutcome::Failed { reason, lines } if lines.is_empty() => Some(reason.clone()),
            PublishOutcome::Failed { reason, lines } => Some(format!("{}: {}", reason, lines.join("; "))),
            _ => None,
          };
          let failed = failed_detail.is_some();
          match failed_detail {
            Some(detail) => batch.record_err(&name, detail),
            None => batch.record_ok(&name, report),
          }
          failed
        }
        Err(e) => {
          batch.record_err(&name, &e);
          true
        }
      };
      if failure && !continue_on_error {
        batch.abort(pending.by_ref());
        break;
      }
    }
    Ok(batch)
  }
}
