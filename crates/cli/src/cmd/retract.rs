//! Retract command implementation.
//!
//! Deletes published versions. Asks for confirmation unless `--force` or
//! `--dry-run` is given; declining leaves everything untouched.

use anyhow::{Result, bail};

use pkgctl_lib::credentials::CredentialResolver;
use pkgctl_lib::platform::Platform;
use pkgctl_lib::process::SystemRunner;
use pkgctl_lib::publish::PublishMethod;
use pkgctl_lib::retract::{RetractReport, RetractRequest, RetractTarget, Retractor, VersionOutcome, parse_version_spec};

use super::{load_config, resolve_platform, runtime};
use crate::output::{OutputFormat, print_error, print_info, print_json, print_stat, print_success, symbols};
use crate::prompts::confirm;

pub struct RetractArgs {
  pub package: String,
  pub channel: String,
  pub versions: String,
  pub method: PublishMethod,
  pub platform: Option<Platform>,
  pub ext: String,
  pub force: bool,
  pub dry_run: bool,
}

pub fn cmd_retract(args: RetractArgs, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let platform = resolve_platform(args.platform)?;
  let target = RetractTarget::from_config(args.method, &config, &args.channel)?;

  let mut request = RetractRequest::new(&args.package, &args.versions, platform);
  request.ext = args.ext;
  request.dry_run = args.dry_run;

  if !args.dry_run {
    let versions = parse_version_spec(&args.versions);
    if !versions.is_empty() {
      let message = format!(
        "Delete {} version(s) of {} ({}) for {} from {}?",
        versions.len(),
        args.package,
        versions.join(", "),
        platform,
        target
      );
      if !confirm(&message, args.force)? {
        print_info("Retraction cancelled; nothing was deleted");
        return Ok(());
      }
    }
  }

  let credentials = CredentialResolver::from_env();
  let runner = SystemRunner;
  let retractor = Retractor::new(&runner, &config, &credentials)?;

  let rt = runtime()?;
  let report = rt.block_on(retractor.retract(&request, &target))?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_report(&report);
  }

  if report.failures() > 0 {
    bail!(
      "{} of {} version(s) of {} could not be retracted",
      report.failures(),
      report.versions.len(),
      report.package
    );
  }
  Ok(())
}

fn print_report(report: &RetractReport) {
  for result in &report.versions {
    match &result.outcome {
      VersionOutcome::Deleted => print_success(&format!("Deleted {}", result.filename)),
      VersionOutcome::AlreadyGone => print_info(&format!("{} was already gone", result.filename)),
      VersionOutcome::AuthDenied { detail } => {
        print_error(&format!("Not allowed to delete {}: {}", result.filename, detail))
      }
      VersionOutcome::Failed { detail } => print_error(&format!("Failed to delete {}: {}", result.filename, detail)),
      VersionOutcome::DryRun { action } => {
        println!("  {} {} {}", symbols::MINUS, result.filename, symbols::ARROW);
        println!("      {}", action);
      }
    }
    if let Some(note) = &result.note {
      print_stat("Note", note);
    }
  }

  if report.dry_run {
    println!();
    print_info(&format!("Dry run: nothing was deleted from {}", report.target));
    return;
  }

  println!();
  print_stat("Deleted", &report.deleted().to_string());
  print_stat("Already gone", &report.already_gone().to_string());
  print_stat("Failed", &report.failures().to_string());
}
