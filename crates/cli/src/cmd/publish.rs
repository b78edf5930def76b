//! Publish commands.

use anyhow::{Result, bail};

use pkgctl_lib::credentials::CredentialResolver;
use pkgctl_lib::platform::Platform;
use pkgctl_lib::process::SystemRunner;
use pkgctl_lib::publish::{PublishBatch, PublishMethod, PublishOutcome, PublishReport, PublishTarget, Publisher};

use super::{load_config, resolve_platform, runtime};
use crate::output::{OutputFormat, print_error, print_info, print_json, print_stat, print_success, print_warning};

pub struct PublishArgs {
  pub method: PublishMethod,
  pub channel: Option<String>,
  pub platform: Option<Platform>,
  pub dry_run: bool,
}

pub fn cmd_publish(package: &str, args: PublishArgs, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let platform = resolve_platform(args.platform)?;
  let target = PublishTarget::from_config(args.method, &config, args.channel.as_deref())?;
  let credentials = CredentialResolver::from_env();
  let runner = SystemRunner;
  let publisher = Publisher::new(&runner, &config, &credentials);

  let rt = runtime()?;
  let report = rt.block_on(publisher.publish(package, &target, platform, args.dry_run))?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_report(&report);
  }

  if let PublishOutcome::Failed { reason, .. } = &report.outcome {
    bail!("Publishing {} to {} failed: {}", package, target, reason);
  }
  Ok(())
}

pub fn cmd_publish_all(args: PublishArgs, continue_on_error: bool, output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let platform = resolve_platform(args.platform)?;
  let target = PublishTarget::from_config(args.method, &config, args.channel.as_deref())?;
  let credentials = CredentialResolver::from_env();
  let runner = SystemRunner;
  let publisher = Publisher::new(&runner, &config, &credentials);

  let rt = runtime()?;
  let batch = rt.block_on(publisher.publish_all(&target, platform, continue_on_error, args.dry_run))?;

  if output.is_json() {
    print_json(&batch)?;
  } else {
    print_batch(&batch, platform);
  }

  if batch.has_failures() && !continue_on_error && !args.dry_run {
    bail!("{} of {} upload(s) failed", batch.failed(), batch.entries.len());
  }
  Ok(())
}

fn print_report(report: &PublishReport) {
  if report.credential_missing {
    print_warning(&format!(
      "No credential found for {}; relying on the upload tool's own login",
      report.target.remote().base_url
    ));
  }

  match &report.outcome {
    PublishOutcome::Published => {
      print_success(&format!("Published {} to {}", report.package, report.target));
      print_stat("Artifact", &report.artifact.display().to_string());
    }
    PublishOutcome::AlreadyExists => {
      print_info(&format!("{} already exists at {}", report.package, report.target));
    }
    PublishOutcome::Failed { reason, lines } => {
      print_error(&format!("Failed to publish {}: {}", report.package, reason));
      for line in lines {
        println!("    {}", line);
      }
    }
    PublishOutcome::DryRun { command } => {
      print_info(&format!("Would publish {} to {}", report.package, report.target));
      print_stat("Command", command);
    }
  }
}

fn print_batch(batch: &PublishBatch, platform: Platform) {
  if batch.entries.is_empty() {
    print_info(&format!("Nothing recorded in the manifest for {}", platform));
    return;
  }

  for entry in &batch.entries {
    match (&entry.outcome, &entry.error) {
      (Some(report), _) => print_report(report),
      (None, Some(error)) => print_error(&format!("{}: {}", entry.name, error)),
      (None, None) => {}
    }
  }

  println!();
  print_stat("Published", &batch.published().to_string());
  print_stat("Already present", &batch.already_exists().to_string());
  print_stat("Failed", &batch.failed().to_string());

  if batch.aborted {
    print_warning(&format!(
      "Stopped after the first failure; not attempted: {}",
      batch.not_attempted.join(", ")
    ));
  }
}
