//! Credential resolution for remote channels.
//!
//! A [`CredentialResolver`] holds an ordered list of [`CredentialSource`]
//! strategies and returns the first credential any of them yields:
//!
//! 1. the remote-specific environment variable(s)
//! 2. the auth file named by `RATTLER_AUTH_FILE`
//! 3. the default auth file locations, in order
//!
//! Resolution never fails. A source that cannot read or parse its input is
//! treated as having nothing for the remote.

mod auth_file;

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

pub use auth_file::AuthFileSource;

use crate::consts::{
  ENV_ANACONDA_TOKEN, ENV_AUTH_FILE, ENV_AWS_ACCESS_KEY_ID, ENV_AWS_SECRET_ACCESS_KEY, ENV_AWS_SESSION_TOKEN,
  ENV_PREFIX_TOKEN,
};
use crate::platform::paths::{config_dir, home_dir};

const ANACONDA_HOST: &str = "anaconda.org";

/// How a remote authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKind {
  /// Bearer token in an HTTP header.
  Token,
  /// Access-key pair for an S3-compatible bucket.
  ObjectStorage,
}

/// A named remote endpoint that may need credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
  pub name: String,
  pub base_url: String,
  pub kind: RemoteKind,
  /// Environment variable holding this remote's token, for token remotes.
  pub token_env: Option<String>,
}

impl Remote {
  pub fn prefix(base_url: &str) -> Self {
    Self {
      name: "prefix".to_string(),
      base_url: base_url.trim_end_matches('/').to_string(),
      kind: RemoteKind::Token,
      token_env: Some(ENV_PREFIX_TOKEN.to_string()),
    }
  }

  pub fn anaconda(base_url: &str) -> Self {
    Self {
      name: "anaconda".to_string(),
      base_url: base_url.trim_end_matches('/').to_string(),
      kind: RemoteKind::Token,
      token_env: Some(ENV_ANACONDA_TOKEN.to_string()),
    }
  }

  /// The remote for a token-authenticated upload server. anaconda.org hosts
  /// use their own token variable; every other server is prefix-compatible.
  pub fn token_server(server: &str) -> Self {
    let remote = Self::prefix(server);
    let host = remote.host().split('/').next().unwrap_or_default();
    if host == ANACONDA_HOST || host.ends_with(".anaconda.org") {
      return Self::anaconda(server);
    }
    remote
  }

  /// An S3 bucket remote; `url` is `s3://bucket[/channel]`. Credentials are
  /// per bucket, so the base URL is always the bucket root.
  pub fn object_storage(url: &str) -> Self {
    let base_url = match bucket_of(url) {
      Some(bucket) => format!("s3://{}", bucket),
      None => url.trim_end_matches('/').to_string(),
    };
    Self {
      name: "s3".to_string(),
      base_url,
      kind: RemoteKind::ObjectStorage,
      token_env: None,
    }
  }

  /// The base URL without scheme or trailing slash (`prefix.dev`).
  pub fn host(&self) -> &str {
    let without_scheme = self.base_url.split_once("://").map_or(self.base_url.as_str(), |(_, rest)| rest);
    without_scheme.trim_end_matches('/')
  }
}

/// The bucket name of an `s3://bucket[/prefix]` URL.
pub fn bucket_of(url: &str) -> Option<&str> {
  url.strip_prefix("s3://")?.split('/').next().filter(|b| !b.is_empty())
}

/// A resolved secret. `Debug` never prints the secret values.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
  Bearer(String),
  AccessKey {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
  },
}

impl Credential {
  /// Environment variables that hand this credential to a child process
  /// authenticating against `remote`.
  pub fn child_env(&self, remote: &Remote) -> Vec<(String, String)> {
    match self {
      Credential::Bearer(token) => remote
        .token_env
        .iter()
        .map(|key| (key.clone(), token.clone()))
        .collect(),
      Credential::AccessKey {
        access_key_id,
        secret_access_key,
        session_token,
      } => {
        let mut env = vec![
          (ENV_AWS_ACCESS_KEY_ID.to_string(), access_key_id.clone()),
          (ENV_AWS_SECRET_ACCESS_KEY.to_string(), secret_access_key.clone()),
        ];
        if let Some(token) = session_token {
          env.push((ENV_AWS_SESSION_TOKEN.to_string(), token.clone()));
        }
        env
      }
    }
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Credential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
      Credential::AccessKey { session_token, .. } => f
        .debug_struct("AccessKey")
        .field("access_key_id", &"<redacted>")
        .field("secret_access_key", &"<redacted>")
        .field("session_token", &session_token.as_ref().map(|_| "<redacted>"))
        .finish(),
    }
  }
}

/// One place a credential may come from.
pub trait CredentialSource {
  /// Short label for diagnostics.
  fn describe(&self) -> String;

  fn try_resolve(&self, remote: &Remote) -> Option<Credential>;
}

/// Remote-specific environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVarSource;

fn non_empty_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl CredentialSource for EnvVarSource {
  fn describe(&self) -> String {
    "environment".to_string()
  }

  fn try_resolve(&self, remote: &Remote) -> Option<Credential> {
    match remote.kind {
      RemoteKind::Token => remote.token_env.as_deref().and_then(non_empty_var).map(Credential::Bearer),
      RemoteKind::ObjectStorage => Some(Credential::AccessKey {
        access_key_id: non_empty_var(ENV_AWS_ACCESS_KEY_ID)?,
        secret_access_key: non_empty_var(ENV_AWS_SECRET_ACCESS_KEY)?,
        session_token: non_empty_var(ENV_AWS_SESSION_TOKEN),
      }),
    }
  }
}

/// Ordered list of credential sources; the first hit wins.
pub struct CredentialResolver {
  sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
  pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
    Self { sources }
  }

  /// The standard order: environment, `RATTLER_AUTH_FILE`, default files.
  pub fn from_env() -> Self {
    let mut sources: Vec<Box<dyn CredentialSource>> = vec![Box::new(EnvVarSource)];
    if let Some(path) = std::env::var_os(ENV_AUTH_FILE) {
      sources.push(Box::new(AuthFileSource::new(PathBuf::from(path))));
    }
    for path in default_auth_files() {
      sources.push(Box::new(AuthFileSource::new(path)));
    }
    Self::new(sources)
  }

  pub fn resolve(&self, remote: &Remote) -> Option<Credential> {
    for source in &self.sources {
      if let Some(credential) = source.try_resolve(remote) {
        debug!(remote = %remote.name, source = %source.describe(), "resolved credential");
        return Some(credential);
      }
    }
    debug!(remote = %remote.name, url = %remote.base_url, "no credential found");
    None
  }

  pub fn sources(&self) -> impl Iterator<Item = String> + '_ {
    self.sources.iter().map(|s| s.describe())
  }
}

/// Default auth file locations, most specific first.
pub fn default_auth_files() -> Vec<PathBuf> {
  let mut files = Vec::new();
  if let Some(home) = home_dir() {
    files.push(home.join(".rattler").join("credentials.json"));
  }
  if let Some(config) = config_dir() {
    files.push(config.join("credentials.json"));
  }
  files
}
