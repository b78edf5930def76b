use anyhow::Result;

use pkgctl_lib::platform::Platform;

use super::{load_config, manifest_store};
use crate::output::{OutputFormat, print_info, print_json, print_success, symbols};

pub fn cmd_clean(platform: Option<Platform>, dry_run: bool, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let store = manifest_store(&config);
  let stale = store.cleanup(platform.as_ref().map(Platform::as_str), dry_run)?;

  if output.is_json() {
    return print_json(&stale);
  }

  if stale.is_empty() {
    print_info("Manifest is clean; every recorded artifact exists");
    return Ok(());
  }

  for entry in &stale {
    println!(
      "  {} {}/{} ({})",
      symbols::MINUS,
      entry.platform,
      entry.package,
      entry.record.artifact_path.display()
    );
  }
  if dry_run {
    print_info(&format!("Would remove {} stale entry(ies)", stale.len()));
  } else {
    print_success(&format!("Removed {} stale entry(ies)", stale.len()));
  }
  Ok(())
}
