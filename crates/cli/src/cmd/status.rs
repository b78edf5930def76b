//! Status command implementation.
//!
//! Prints what the manifest records for each platform, optionally checking
//! that recorded artifacts still exist.

use std::time::SystemTime;

use anyhow::Result;
use serde::Serialize;

use pkgctl_lib::manifest::BuildRecord;
use pkgctl_lib::platform::Platform;

use super::{load_config, manifest_store};
use crate::output::{OutputFormat, format_age, format_bytes, print_info, print_json, print_stat, print_warning, symbols};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusEntry<'a> {
  platform: &'a str,
  package: &'a str,
  artifact_exists: bool,
  #[serde(flatten)]
  record: &'a BuildRecord,
}

pub fn cmd_status(platform: Option<Platform>, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let manifest = manifest_store(&config).load()?;

  let entries: Vec<StatusEntry> = manifest
    .iter()
    .filter(|(p, _, _)| platform.is_none_or(|want| want.as_str() == *p))
    .map(|(p, package, record)| StatusEntry {
      platform: p,
      package,
      artifact_exists: record.artifact_exists(),
      record,
    })
    .collect();

  if output.is_json() {
    return print_json(&entries);
  }

  if entries.is_empty() {
    print_info(&format!(
      "No builds recorded in {}. Run 'pkgctl build <package>' first.",
      config.manifest_path.display()
    ));
    return Ok(());
  }

  let now = SystemTime::now();
  let mut current: Option<&str> = None;
  for entry in &entries {
    if current != Some(entry.platform) {
      if current.is_some() {
        println!();
      }
      println!("{}:", entry.platform);
      current = Some(entry.platform);
    }

    let age = format_age(&entry.record.built_at, now).unwrap_or_else(|| entry.record.built_at.clone());
    let marker = if entry.artifact_exists { symbols::INFO } else { symbols::WARNING };
    println!(
      "  {} {} ({}, {}, {})",
      marker,
      entry.package,
      entry.record.status,
      format_bytes(entry.record.size_bytes),
      age
    );
    if verbose {
      print_stat("  Artifact", &entry.record.artifact_path.display().to_string());
      print_stat("  Modified", &entry.record.last_modified);
    }
  }

  let missing = entries.iter().filter(|e| !e.artifact_exists).count();
  if missing > 0 {
    println!();
    print_warning(&format!(
      "{} recorded artifact(s) no longer exist; run 'pkgctl clean' to drop them",
      missing
    ));
  }
  Ok(())
}
