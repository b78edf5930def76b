//! Shared utilities.
//!
//! Timestamp formatting and test helpers.

use std::time::SystemTime;

/// Format a timestamp as RFC 3339 in UTC with second precision.
pub fn rfc3339(time: SystemTime) -> String {
  humantime::format_rfc3339_seconds(time).to_string()
}

#[cfg(test)]
pub mod testutil;

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::{Duration, UNIX_EPOCH};

  #[test]
  fn formats_utc_seconds() {
    let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    assert_eq!(rfc3339(t), "2023-11-14T22:13:20Z");
  }
}
