//! Parser for the plain-text output of `<tool> search`.
//!
//! The search tool prints a human-oriented table, e.g.
//!
//! ```text
//! Loading channels: done
//! # Name                       Version           Build  Channel
//! pwgen                           2.08      h0_1234  conda-forge
//! pwgen                           2.08      h0_5678  conda-forge
//! ```
//!
//! Rows are recognised by their first field being exactly the package name
//! and having at least three whitespace-separated fields. Only the first
//! contiguous block of such rows is used. This format is owned by the wrapped
//! tool and may drift between its releases; this module is the only place
//! that knows about it.

use serde::Serialize;

/// Upper bound on sample rows kept per query.
pub const MAX_SAMPLE_MATCHES: usize = 5;

/// One `(version, build)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleMatch {
  pub version: String,
  pub build_identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchMatches {
  pub count: usize,
  pub samples: Vec<SampleMatch>,
}

fn parse_row(name: &str, line: &str) -> Option<SampleMatch> {
  let mut fields = line.split_whitespace();
  if fields.next()? != name {
    return None;
  }
  let version = fields.next()?;
  let build = fields.next()?;
  Some(SampleMatch {
    version: version.to_string(),
    build_identifier: build.to_string(),
  })
}

/// Extract the rows for `name` from search output.
pub fn parse_search_output(name: &str, text: &str) -> SearchMatches {
  let mut matches = SearchMatches::default();
  let mut in_block = false;

  for line in text.lines() {
    match parse_row(name, line.trim()) {
      Some(row) => {
        in_block = true;
        matches.count += 1;
        if matches.samples.len() < MAX_SAMPLE_MATCHES {
          matches.samples.push(row);
        }
      }
      None if in_block => break,
      None => {}
    }
  }

  matches
}

#[cfg(test)]
mod tests {
  use super::*;

  const CONDA_OUTPUT: &str = "\
Loading channels: done
# Name                       Version           Build  Channel
pwgen                           2.08      h0_1234  conda-forge
pwgen                           2.08      h0_5678  conda-forge
";

  #[test]
  fn parses_table_rows() {
    let matches = parse_search_output("pwgen", CONDA_OUTPUT);
    assert_eq!(matches.count, 2);
    assert_eq!(
      matches.samples[0],
      SampleMatch {
        version: "2.08".to_string(),
        build_identifier: "h0_1234".to_string()
      }
    );
  }

  #[test]
  fn requires_exact_name_in_first_field() {
    let text = "pwgen-extra 1.0 h0 conda-forge\npwgenx 1.0 h0 conda-forge\n";
    assert_eq!(parse_search_output("pwgen", text).count, 0);
  }

  #[test]
  fn requires_three_fields() {
    assert_eq!(parse_search_output("pwgen", "pwgen 2.08\n").count, 0);
  }

  #[test]
  fn only_first_contiguous_block_counts() {
    let text = "pwgen 1.0 a x\npwgen 1.1 b x\n\nfooter\npwgen 9.9 z x\n";
    let matches = parse_search_output("pwgen", text);
    assert_eq!(matches.count, 2);
    assert_eq!(matches.samples.last().unwrap().version, "1.1");
  }

  #[test]
  fn samples_are_bounded() {
    let text: String = (0..12).map(|i| format!("pwgen 1.{} h{} conda-forge\n", i, i)).collect();
    let matches = parse_search_output("pwgen", &text);
    assert_eq!(matches.count, 12);
    assert_eq!(matches.samples.len(), MAX_SAMPLE_MATCHES);
  }

  #[test]
  fn empty_output_has_no_matches() {
    assert_eq!(parse_search_output("pwgen", ""), SearchMatches::default());
  }
}
