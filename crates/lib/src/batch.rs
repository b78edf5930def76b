//! Sequential batch runs with abort-or-continue semantics.

use serde::Serialize;

/// Result for one item of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry<T> {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outcome: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl<T> BatchEntry<T> {
  pub fn is_failure(&self) -> bool {
    self.error.is_some()
  }
}

/// Per-item outcomes of a batch, in processing order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport<T> {
  pub entries: Vec<BatchEntry<T>>,
  /// Items never attempted because an earlier one failed.
  pub not_attempted: Vec<String>,
  pub aborted: bool,
}

impl<T> Default for BatchReport<T> {
  fn default() -> Self {
    Self {
      entries: Vec::new(),
      not_attempted: Vec::new(),
      aborted: false,
    }
  }
}

impl<T> BatchReport<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record_ok(&mut self, name: &str, outcome: T) {
    self.entries.push(BatchEntry {
      name: name.to_string(),
      outcome: Some(outcome),
      error: None,
    });
  }

  pub fn record_err(&mut self, name: &str, error: impl ToString) {
    self.entries.push(BatchEntry {
      name: name.to_string(),
      outcome: None,
      error: Some(error.to_string()),
    });
  }

  /// Stop the batch; `rest` are the names that will not run.
  pub fn abort(&mut self, rest: impl IntoIterator<Item = String>) {
    self.aborted = true;
    self.not_attempted.extend(rest);
  }

  pub fn failed(&self) -> usize {
    self.entries.iter().filter(|e| e.is_failure()).count()
  }

  pub fn has_failures(&self) -> bool {
    self.failed() > 0
  }

  pub fn outcomes(&self) -> impl Iterator<Item = &T> {
    self.entries.iter().filter_map(|e| e.outcome.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_failures_and_aborts() {
    let mut report: BatchReport<u32> = BatchReport::new();
    report.record_ok("a", 1);
    report.record_err("b", "boom");
    report.abort(vec!["c".to_string()]);

    assert_eq!(report.failed(), 1);
    assert!(report.aborted);
    assert_eq!(report.not_attempted, vec!["c"]);
    assert_eq!(report.outcomes().copied().collect::<Vec<_>>(), vec![1]);
  }
}
