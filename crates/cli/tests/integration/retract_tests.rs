//! retract integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn dry_run_lists_deletions_without_credentials() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args([
      "retract",
      "pwgen",
      "--channel",
      "chan",
      "--versions",
      "1.0.0,1.1.0",
      "--platform",
      "linux-64",
      "--dry-run",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains(
      "DELETE https://prefix.dev/api/v1/delete/chan/linux-64/pwgen-1.0.0-linux-64.conda",
    ))
    .stdout(predicate::str::contains("pwgen-1.1.0-linux-64.conda"))
    .stdout(predicate::str::contains("nothing was deleted"));
}

#[test]
fn range_warns_that_only_endpoints_are_retracted() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args([
      "retract",
      "pwgen",
      "--channel",
      "chan",
      "--versions",
      "1.0.0-1.2.0",
      "--platform",
      "linux-64",
      "--dry-run",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("pwgen-1.2.0-linux-64.conda"))
    .stdout(predicate::str::contains("pwgen-1.1.0").not())
    .stderr(predicate::str::contains("retract only their endpoints"));
}

#[test]
fn non_interactive_retract_needs_force() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args(["retract", "pwgen", "--channel", "chan", "--versions", "1.0.0", "--platform", "linux-64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));

  assert!(env.tool_calls().is_empty());
}

#[test]
fn empty_version_list_is_rejected() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args(["retract", "pwgen", "--channel", "chan", "--versions", " , ", "--force"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no versions given"));
}

#[test]
fn missing_token_fails_before_deleting() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args([
      "retract",
      "pwgen",
      "--channel",
      "chan",
      "--versions",
      "1.0.0",
      "--platform",
      "linux-64",
      "--force",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no credential"))
    .stderr(predicate::str::contains("PREFIX_API_KEY"));
}

#[test]
fn object_storage_retract_deletes_each_version() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .env("PKGCTL_S3_CHANNEL", "s3://bucket/main")
    .env("AWS_ACCESS_KEY_ID", "AKIA")
    .env("AWS_SECRET_ACCESS_KEY", "secret")
    .args([
      "retract",
      "pwgen",
      "--method",
      "object-storage",
      "--channel",
      "chan",
      "--versions",
      "1.0.0,1.1.0",
      "--platform",
      "linux-64",
      "--force",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Deleted pwgen-1.0.0-linux-64.conda"))
    .stdout(predicate::str::contains("Deleted pwgen-1.1.0-linux-64.conda"))
    .stdout(predicate::str::contains("re-index"));

  let removals: Vec<String> = env.tool_calls().into_iter().filter(|l| l.starts_with("s3 rm ")).collect();
  assert_eq!(
    removals,
    vec![
      "s3 rm s3://bucket/chan/linux-64/pwgen-1.0.0-linux-64.conda",
      "s3 rm s3://bucket/chan/linux-64/pwgen-1.1.0-linux-64.conda",
    ]
  );
}

#[test]
fn object_storage_retract_without_bucket_is_rejected() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args([
      "retract",
      "pwgen",
      "--method",
      "object-storage",
      "--channel",
      "chan",
      "--versions",
      "1.0.0",
      "--force",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("PKGCTL_S3_CHANNEL"));
}
