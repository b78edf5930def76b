//! Version list syntax for retraction.
//!
//! - `1.0.0` is one version.
//! - `1.0.0,1.1.0` is a list, kept in the given order.
//! - `1.0.0-1.2.0` is a range. Only its two endpoints are returned; versions
//!   between them are not enumerated.
//!
//! Conda versions cannot contain `-`, so a single `-` is always a range.

use tracing::warn;

use crate::platform::Platform;

/// Expand a version spec into an ordered, de-duplicated list.
///
/// Blank input, or input with only separators, yields an empty list.
pub fn parse_version_spec(spec: &str) -> Vec<String> {
  let mut versions: Vec<String> = Vec::new();
  let mut push = |v: &str| {
    if !versions.iter().any(|existing| existing == v) {
      versions.push(v.to_string());
    }
  };

  for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
    match item.split_once('-') {
      Some((start, end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
        warn!(
          range = item,
          "version ranges retract only their endpoints; list intermediate versions explicitly"
        );
        push(start.trim());
        push(end.trim());
      }
      _ => push(item.trim_matches('-')),
    }
  }

  versions.retain(|v| !v.is_empty());
  versions
}

/// `<name>-<version>-<platform>.<ext>`
pub fn canonical_filename(name: &str, version: &str, platform: Platform, ext: &str) -> String {
  format!("{}-{}-{}.{}", name, version, platform, ext.trim_start_matches('.'))
}
