//! JSON auth files keyed by base URL.
//!
//! ```json
//! {
//!   "https://prefix.dev": { "BearerToken": "pfx_..." },
//!   "api.anaconda.org": { "CondaToken": "..." },
//!   "s3://my-bucket": {
//!     "S3Credentials": { "access_key_id": "...", "secret_access_key": "..." }
//!   }
//! }
//! ```

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use super::{Credential, CredentialSource, Remote, RemoteKind};

/// Field names that may hold a bearer token directly.
const TOKEN_FIELDS: [&str; 3] = ["BearerToken", "CondaToken", "token"];

#[derive(Debug, Clone)]
pub struct AuthFileSource {
  path: PathBuf,
}

impl AuthFileSource {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  fn load(&self) -> Option<Value> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) => {
        debug!(path = %self.path.display(), error = %e, "auth file not readable");
        return None;
      }
    };
    match serde_json::from_str::<Value>(&content) {
      Ok(value) if value.is_object() => Some(value),
      Ok(_) => {
        debug!(path = %self.path.display(), "auth file is not a JSON object");
        None
      }
      Err(e) => {
        debug!(path = %self.path.display(), error = %e, "auth file is not valid JSON");
        None
      }
    }
  }
}

impl CredentialSource for AuthFileSource {
  fn describe(&self) -> String {
    format!("auth file {}", self.path.display())
  }

  fn try_resolve(&self, remote: &Remote) -> Option<Credential> {
    let doc = self.load()?;
    let entry = doc.get(remote.base_url.as_str()).or_else(|| doc.get(remote.host()))?;
    credential_from_entry(remote.kind, entry)
  }
}

fn credential_from_entry(kind: RemoteKind, entry: &Value) -> Option<Credential> {
  match kind {
    RemoteKind::Token => bearer_token(entry).map(Credential::Bearer),
    RemoteKind::ObjectStorage => {
      let keys = entry.get("S3Credentials").unwrap_or(entry);
      Some(Credential::AccessKey {
        access_key_id: string_field(keys, "access_key_id")?,
        secret_access_key: string_field(keys, "secret_access_key")?,
        session_token: string_field(keys, "session_token"),
      })
    }
  }
}

fn bearer_token(entry: &Value) -> Option<String> {
  if let Some(token) = TOKEN_FIELDS.iter().find_map(|field| string_field(entry, field)) {
    return Some(token);
  }
  // {"Bearer": {"token": "..."}}
  entry.get("Bearer").and_then(|nested| string_field(nested, "token"))
}

fn string_field(value: &Value, field: &str) -> Option<String> {
  value
    .get(field)
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .map(String::from)
}
