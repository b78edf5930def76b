//! Deletion backends.

use std::fmt;

use serde::Serialize;

use super::VersionOutcome;
use crate::credentials::Remote;
use crate::platform::Platform;
use crate::process::{CapturedOutput, CommandSpec};

const GONE_MARKERS: [&str; 3] = ["nosuchkey", "not found", "404"];
const DENIED_MARKERS: [&str; 3] = ["accessdenied", "forbidden", "403"];

/// Where retracted artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum RetractTarget {
  /// Package server with a token-authenticated delete API.
  Token { server: String, channel: String },
  /// Channel stored as `<bucket_url>/<channel>/<platform>/<file>`.
  #[serde(rename_all = "camelCase")]
  ObjectStorage {
    bucket_url: String,
    channel: String,
    endpoint_url: Option<String>,
  },
}

impl RetractTarget {
  pub fn remote(&self) -> Remote {
    match self {
      RetractTarget::Token { server, .. } => Remote::token_server(server),
      RetractTarget::ObjectStorage { bucket_url, .. } => Remote::object_storage(bucket_url),
    }
  }

  pub fn channel(&self) -> &str {
    match self {
      RetractTarget::Token { channel, .. } | RetractTarget::ObjectStorage { channel, .. } => channel,
    }
  }

  /// `DELETE` endpoint for one artifact.
  pub fn delete_url(&self, platform: Platform, filename: &str) -> Option<String> {
    match self {
      RetractTarget::Token { server, channel } => Some(format!(
        "{}/api/v1/delete/{}/{}/{}",
        server.trim_end_matches('/'),
        channel,
        platform,
        filename
      )),
      RetractTarget::ObjectStorage { .. } => None,
    }
  }

  /// `s3://bucket/<channel>/<platform>/<name>` for object storage.
  pub fn object_url(&self, platform: Platform, name: &str) -> Option<String> {
    match self {
      RetractTarget::ObjectStorage { bucket_url, channel, .. } => Some(format!(
        "{}/{}/{}/{}",
        bucket_url.trim_end_matches('/'),
        channel.trim_matches('/'),
        platform,
        name
      )),
      RetractTarget::Token { .. } => None,
    }
  }

  /// Object-storage CLI call: `<tool> s3 <verb> <args..> [--endpoint-url ..]`.
  pub fn s3_command(&self, tool: &str, verb: &str, args: &[&str]) -> CommandSpec {
    let mut command = CommandSpec::new(tool).args(["s3", verb]).args(args.iter().copied());
    if let RetractTarget::ObjectStorage {
      endpoint_url: Some(endpoint),
      ..
    } = self
    {
      command = command.args(["--endpoint-url", endpoint.as_str()]);
    }
    command
  }

  /// What a dry run reports for one artifact.
  pub fn describe_delete(&self, tool: &str, platform: Platform, filename: &str) -> String {
    match self {
      RetractTarget::Token { .. } => format!("DELETE {}", self.delete_url(platform, filename).unwrap_or_default()),
      RetractTarget::ObjectStorage { .. } => {
        let url = self.object_url(platform, filename).unwrap_or_default();
        self.s3_command(tool, "rm", &[url.as_str()]).to_string()
      }
    }
  }
}

impl fmt::Display for RetractTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RetractTarget::Token { server, channel } => write!(f, "{}/{}", server.trim_end_matches('/'), channel),
      RetractTarget::ObjectStorage { bucket_url, channel, .. } => {
        write!(f, "{}/{}", bucket_url.trim_end_matches('/'), channel)
      }
    }
  }
}

/// Classify an HTTP status from the delete API.
pub fn classify_http(status: u16, body: &str) -> VersionOutcome {
  match status {
    200..=299 => VersionOutcome::Deleted,
    404 => VersionOutcome::AlreadyGone,
    401 | 403 => VersionOutcome::AuthDenied {
      detail: format!("HTTP {}", status),
    },
    _ => VersionOutcome::Failed {
      detail: match body.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => format!("HTTP {}: {}", status, line),
        None => format!("HTTP {}", status),
      },
    },
  }
}

/// Classify an object-storage `rm`.
pub fn classify_s3(output: &CapturedOutput) -> VersionOutcome {
  if output.success() {
    return VersionOutcome::Deleted;
  }
  let lower = output.text.to_lowercase();
  let detail = output.tail(1).first().map(|l| l.trim().to_string()).unwrap_or_default();
  if GONE_MARKERS.iter().any(|m| lower.contains(m)) {
    VersionOutcome::AlreadyGone
  } else if DENIED_MARKERS.iter().any(|m| lower.contains(m)) {
    VersionOutcome::AuthDenied { detail }
  } else {
    VersionOutcome::Failed {
      detail: format!("exit {:?}: {}", output.code, detail),
    }
  }
}
