//! Upload destinations: command construction and result classification.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use super::PublishOutcome;
use crate::credentials::Remote;
use crate::process::{CapturedOutput, CommandSpec};

/// Error-indicative lines kept from a failed upload.
pub const MAX_FAILURE_LINES: usize = 5;

const FAILURE_MARKERS: [&str; 6] = ["error", "failed", "denied", "unauthorized", "forbidden", "conflict"];
const ALREADY_EXISTS_PHRASES: [&str; 3] = ["already exists", "precondition failed", "preconditionfailed"];
/// Words that may precede an HTTP status code in uploader output.
const STATUS_WORDS: [&str; 3] = ["http", "status", "code"];
const PRECONDITION_FAILED_STATUS: &str = "412";

/// How to reach an upload destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMethod {
  /// Token-authenticated package server (prefix.dev style).
  Token,
  /// S3-compatible bucket.
  ObjectStorage,
}

impl fmt::Display for PublishMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishMethod::Token => f.write_str("token"),
      PublishMethod::ObjectStorage => f.write_str("object-storage"),
    }
  }
}

impl FromStr for PublishMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "token" | "prefix" => Ok(PublishMethod::Token),
      "object-storage" | "s3" => Ok(PublishMethod::ObjectStorage),
      other => Err(format!("unknown method '{}', expected token or object-storage", other)),
    }
  }
}

/// A concrete upload destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum PublishTarget {
  Token {
    server: String,
    channel: String,
  },
  #[serde(rename_all = "camelCase")]
  ObjectStorage {
    channel_url: String,
    endpoint_url: Option<String>,
    region: Option<String>,
  },
}

impl PublishTarget {
  pub fn method(&self) -> PublishMethod {
    match self {
      PublishTarget::Token { .. } => PublishMethod::Token,
      PublishTarget::ObjectStorage { .. } => PublishMethod::ObjectStorage,
    }
  }

  /// The remote whose credential the upload needs.
  pub fn remote(&self) -> Remote {
    match self {
      PublishTarget::Token { server, .. } => Remote::token_server(server),
      PublishTarget::ObjectStorage { channel_url, .. } => Remote::object_storage(channel_url),
    }
  }

  /// `<tool> upload prefix|s3 ... <artifact>`.
  pub fn upload_command(&self, tool: &str, artifact: &Path) -> CommandSpec {
    let command = CommandSpec::new(tool).arg("upload");
    let command = match self {
      PublishTarget::Token { server, channel } => command
        .arg("prefix")
        .args(["--url", server.as_str()])
        .args(["--channel", channel.as_str()]),
      PublishTarget::ObjectStorage {
        channel_url,
        endpoint_url,
        region,
      } => {
        let mut command = command.arg("s3").args(["--channel", channel_url.as_str()]);
        if let Some(endpoint) = endpoint_url {
          command = command.args(["--endpoint-url", endpoint.as_str()]);
        }
        if let Some(region) = region {
          command = command.args(["--region", region.as_str()]);
        }
        command
      }
    };
    command.arg(artifact.to_string_lossy())
  }

  /// Map the uploader's exit status and output to an outcome.
  pub fn classify(&self, output: &CapturedOutput) -> PublishOutcome {
    if output.success() {
      return PublishOutcome::Published;
    }

    let lower = output.text.to_lowercase();
    if self.method() == PublishMethod::ObjectStorage && reports_already_exists(&lower) {
      return PublishOutcome::AlreadyExists;
    }

    let mut lines: Vec<String> = output
      .text
      .lines()
      .map(str::trim)
      .filter(|line| {
        let line = line.to_lowercase();
        FAILURE_MARKERS.iter().any(|m| line.contains(m))
      })
      .take(MAX_FAILURE_LINES)
      .map(String::from)
      .collect();
    if lines.is_empty() {
      lines = output.tail(MAX_FAILURE_LINES).into_iter().map(|l| l.trim().to_string()).collect();
    }

    PublishOutcome::Failed {
      reason: match output.code {
        Some(code) => format!("upload exited with status {}", code),
        None => "upload was terminated by a signal".to_string(),
      },
      lines,
    }
  }
}

impl fmt::Display for PublishTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishTarget::Token { server, channel } => write!(f, "{}/{}", server.trim_end_matches('/'), channel),
      PublishTarget::ObjectStorage { channel_url, .. } => f.write_str(channel_url),
    }
  }
}

/// Whether lowercased uploader output says the object is already there:
/// an explicit phrase, or a standalone `412` introduced as an HTTP status
/// (`HTTP/1.1 412`, `status 412`) or followed by `Precondition`.
fn reports_already_exists(lower: &str) -> bool {
  if ALREADY_EXISTS_PHRASES.iter().any(|p| lower.contains(p)) {
    return true;
  }

  let words: Vec<&str> = lower
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|w| !w.is_empty())
    .collect();
  words.iter().enumerate().any(|(i, word)| {
    *word == PRECONDITION_FAILED_STATUS
      && (words.get(i + 1).is_some_and(|next| next.starts_with("precondition"))
        || words[i.saturating_sub(3)..i].iter().any(|prev| STATUS_WORDS.contains(prev)))
  })
}
