//! Working configuration.
//!
//! Everything is read from environment variables with defaults, so a bare
//! checkout with a `pkgs/` recipe tree works without setup. The CLI overrides
//! individual fields from flags after loading.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::consts::*;
use crate::query::Index;

const DEFAULT_RECIPES_DIR: &str = "pkgs";
const DEFAULT_OUTPUT_DIR: &str = "output";
const MANIFEST_FILENAME: &str = "build-manifest.json";
const DEFAULT_PUBLIC_CHANNEL: &str = "conda-forge";
const DEFAULT_PREFIX_URL: &str = "https://prefix.dev";
const DEFAULT_BUILD_TOOL: &str = "rattler-build";
const DEFAULT_SEARCH_TOOL: &str = "conda";
const DEFAULT_S3_TOOL: &str = "aws";
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{var} must be a whole number of seconds, got '{value}'")]
  InvalidTimeout { var: &'static str, value: String },

  #[error("{var} must be an s3:// URL, got '{value}'")]
  InvalidObjectStorageUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
  /// Directory holding one `<package>/recipe.yaml` per package.
  pub recipes_dir: PathBuf,
  /// Builder output root; artifacts land in `<output_dir>/<platform>/`.
  pub output_dir: PathBuf,
  pub manifest_path: PathBuf,
  /// Channels passed to the builder for dependency resolution.
  pub channels: Vec<String>,
  /// Channel always consulted under the `all` skip policy.
  pub public_channel: String,
  pub private_channel: Option<String>,
  /// Object-storage channel (`s3://bucket/channel`), consulted as an extra
  /// index and used as the object-storage publish target.
  pub s3_channel: Option<String>,
  pub s3_endpoint: Option<String>,
  pub s3_region: Option<String>,
  pub prefix_url: String,
  /// Default channel for token uploads and deletions.
  pub publish_channel: Option<String>,
  pub build_tool: String,
  pub search_tool: String,
  pub s3_tool: String,
  #[serde(serialize_with = "serialize_secs")]
  pub query_timeout: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(d.as_secs())
}

fn var(name: &str) -> Option<String> {
  env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
  /// Load the configuration from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    let recipes_dir = var(ENV_RECIPES_DIR).map_or_else(|| PathBuf::from(DEFAULT_RECIPES_DIR), PathBuf::from);

    let output_dir = var(ENV_ARTIFACT_ROOT)
      .or_else(|| var(ENV_OUTPUT_DIR))
      .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from);

    let manifest_path = var(ENV_MANIFEST).map_or_else(|| output_dir.join(MANIFEST_FILENAME), PathBuf::from);

    let public_channel = var(ENV_PUBLIC_CHANNEL).unwrap_or_else(|| DEFAULT_PUBLIC_CHANNEL.to_string());

    let channels = match var(ENV_CHANNELS) {
      Some(list) => list
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect(),
      None => vec![public_channel.clone()],
    };

    let s3_channel = var(ENV_S3_CHANNEL);
    if let Some(url) = &s3_channel
      && !url.starts_with("s3://")
    {
      return Err(ConfigError::InvalidObjectStorageUrl {
        var: ENV_S3_CHANNEL,
        value: url.clone(),
      });
    }

    let query_timeout = match var(ENV_QUERY_TIMEOUT) {
      Some(value) => value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidTimeout {
          var: ENV_QUERY_TIMEOUT,
          value,
        })?,
      None => Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
    };

    Ok(Self {
      recipes_dir,
      output_dir,
      manifest_path,
      channels,
      public_channel,
      private_channel: var(ENV_PRIVATE_CHANNEL),
      s3_channel,
      s3_endpoint: var(ENV_S3_ENDPOINT),
      s3_region: var(ENV_S3_REGION),
      prefix_url: var(ENV_PREFIX_URL).unwrap_or_else(|| DEFAULT_PREFIX_URL.to_string()),
      publish_channel: var(ENV_PUBLISH_CHANNEL),
      build_tool: var(ENV_BUILD_TOOL).unwrap_or_else(|| DEFAULT_BUILD_TOOL.to_string()),
      search_tool: var(ENV_SEARCH_TOOL).unwrap_or_else(|| DEFAULT_SEARCH_TOOL.to_string()),
      s3_tool: var(ENV_S3_TOOL).unwrap_or_else(|| DEFAULT_S3_TOOL.to_string()),
      query_timeout,
    })
  }

  /// The builder's output directory as an index.
  pub fn local_index(&self) -> Index {
    Index::Local {
      root: self.output_dir.clone(),
    }
  }

  pub fn public_index(&self) -> Index {
    Index::Channel {
      id: "public".to_string(),
      channel: self.public_channel.clone(),
    }
  }

  /// Optional indices consulted in addition to the public channel.
  pub fn extra_indices(&self) -> Vec<Index> {
    let mut indices = Vec::new();
    if let Some(channel) = &self.private_channel {
      indices.push(Index::Channel {
        id: "private".to_string(),
        channel: channel.clone(),
      });
    }
    if let Some(url) = &self.s3_channel {
      indices.push(Index::ObjectStorage {
        id: "object-storage".to_string(),
        url: url.clone(),
      });
    }
    indices
  }
}
