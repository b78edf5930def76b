//! Build commands.
//!
//! `build` checks one package against the indices its skip policy names and
//! runs the builder only when none of them has it. `build-all` does the same
//! for every recipe, in name order.

use anyhow::{Result, anyhow, bail};

use pkgctl_lib::build::{BuildBatch, BuildOptions, BuildOutcome, BuildReport, Builder, SkipExisting};
use pkgctl_lib::platform::Platform;
use pkgctl_lib::process::SystemRunner;

use super::{load_config, manifest_store, resolve_platform, runtime};
use crate::output::{
  OutputFormat, format_bytes, print_error, print_info, print_json, print_stat, print_success, print_warning, symbols,
};

pub struct BuildArgs {
  pub platform: Option<Platform>,
  pub skip_existing: SkipExisting,
  pub force: bool,
  pub no_test: bool,
  pub dry_run: bool,
}

impl BuildArgs {
  fn options(&self, verbose: bool) -> Result<BuildOptions> {
    let mut options = BuildOptions::new(resolve_platform(self.platform)?)
      .with_skip_existing(self.skip_existing)
      .with_dry_run(self.dry_run);
    if self.force {
      options = options.forced();
    }
    options.no_test = self.no_test;
    options.verbose = verbose;
    Ok(options)
  }
}

pub fn cmd_build(package: &str, args: BuildArgs, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let options = args.options(verbose)?;
  let runner = SystemRunner;
  let builder = Builder::new(&runner, &config).with_store(manifest_store(&config));

  let rt = runtime()?;
  let report = rt.block_on(builder.build(package, &options)).map_err(|e| {
    if e.is_configuration() {
      anyhow!(e).context("Run 'pkgctl list' to see available packages")
    } else {
      anyhow!(e)
    }
  })?;

  if output.is_json() {
    return print_json(&report);
  }

  print_report(&report, verbose);
  Ok(())
}

pub fn cmd_build_all(args: BuildArgs, continue_on_error: bool, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let options = args.options(verbose)?;
  let runner = SystemRunner;
  let builder = Builder::new(&runner, &config).with_store(manifest_store(&config));

  let rt = runtime()?;
  let batch = rt.block_on(builder.build_all(&options, continue_on_error))?;

  if output.is_json() {
    print_json(&batch)?;
  } else {
    print_batch(&batch, verbose);
  }

  if batch.has_failures() && !continue_on_error && !options.dry_run {
    bail!("{} of {} package(s) failed", batch.failed(), batch.entries.len());
  }
  Ok(())
}

fn print_report(report: &BuildReport, verbose: bool) {
  if verbose {
    for check in &report.checks {
      let state = match (&check.error, check.found) {
        (Some(error), _) => format!("error: {}", error),
        (None, true) => format!("found ({} match(es))", check.match_count),
        (None, false) => "not found".to_string(),
      };
      print_stat(&check.source_id, &state);
    }
  }

  match &report.outcome {
    BuildOutcome::Built { record } => {
      print_success(&format!("Built {} for {}", report.package, report.platform));
      print_stat("Artifact", &record.artifact_path.display().to_string());
      print_stat("Size", &format_bytes(record.size_bytes));
    }
    BuildOutcome::Skipped { record, found_in } => {
      print_info(&format!(
        "{} already available for {} ({}); skipped",
        report.package,
        report.platform,
        found_in.join(", ")
      ));
      if let Some(record) = record {
        print_stat("Artifact", &record.artifact_path.display().to_string());
      }
    }
    BuildOutcome::WouldBuild { command } => {
      print_info(&format!("Would build {} for {}", report.package, report.platform));
      print_stat("Command", command);
    }
  }
}

fn print_batch(batch: &BuildBatch, verbose: bool) {
  for entry in &batch.entries {
    match (&entry.outcome, &entry.error) {
      (Some(report), _) => print_report(report, verbose),
      (None, Some(error)) => print_error(&format!("{}: {}", entry.name, error)),
      (None, None) => {}
    }
  }

  println!();
  print_stat("Built", &batch.built().to_string());
  print_stat("Skipped", &batch.skipped().to_string());
  if batch.would_build() > 0 {
    print_stat("Would build", &batch.would_build().to_string());
  }
  print_stat("Failed", &batch.failed().to_string());

  if batch.aborted {
    print_warning(&format!(
      "Stopped after the first failure; not attempted: {}",
      batch.not_attempted.join(", ")
    ));
    print_info("Pass --continue-on-error to build the remaining packages");
  } else if batch.has_failures() {
    for entry in batch.entries.iter().filter(|e| e.is_failure()) {
      println!("  {} {}", symbols::ERROR, entry.name);
    }
  }
}
