//! publish and publish-all integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

fn built(env: &TestEnv, names: &[&str]) {
  for name in names {
    env.add_recipe(name);
    env
      .pkgctl_cmd()
      .args(["build", name, "--platform", "linux-64", "--skip-existing", "none"])
      .assert()
      .success();
  }
}

#[test]
fn publish_requires_a_build() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  env
    .pkgctl_cmd()
    .args(["publish", "pwgen", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("has not been built for linux-64"))
    .stderr(predicate::str::contains("pkgctl build pwgen --platform linux-64"));

  assert_eq!(env.builder_calls("upload"), 0);
}

#[test]
fn publish_uploads_recorded_artifact() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .env("PREFIX_API_KEY", "secret-token")
    .args(["publish", "pwgen", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Published pwgen to https://prefix.dev/chan"))
    .stderr(predicate::str::contains("No credential").not());

  let uploads: Vec<String> = env.tool_calls().into_iter().filter(|l| l.starts_with("upload ")).collect();
  assert_eq!(uploads.len(), 1);
  assert!(uploads[0].contains("prefix --url https://prefix.dev --channel chan"));
  assert!(uploads[0].ends_with("pwgen-1.0.0-h0.conda"));
}

#[test]
fn publish_without_credential_warns_and_still_uploads() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .env("PKGCTL_PUBLISH_CHANNEL", "chan")
    .args(["publish", "pwgen", "--platform", "linux-64"])
    .assert()
    .success()
    .stderr(predicate::str::contains("No credential found"));

  assert_eq!(env.builder_calls("upload"), 1);
}

#[test]
fn publish_without_channel_is_a_configuration_error() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .args(["publish", "pwgen", "--platform", "linux-64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("PKGCTL_PUBLISH_CHANNEL"));
}

#[test]
fn publish_stale_manifest_names_rebuild_command() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);
  std::fs::remove_file(env.artifact_path("pwgen")).unwrap();

  env
    .pkgctl_cmd()
    .args(["publish", "pwgen", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no longer exists"))
    .stderr(predicate::str::contains("--force"));

  assert_eq!(env.builder_calls("upload"), 0);
}

#[test]
fn publish_failure_shows_error_lines() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .env("FAKE_UPLOAD_FAIL", "1")
    .args(["publish", "pwgen", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("error: 401 Unauthorized"))
    .stdout(predicate::str::contains("Uploading...").not());
}

#[test]
fn publish_dry_run_prints_command() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .args([
      "publish",
      "pwgen",
      "--platform",
      "linux-64",
      "--method",
      "object-storage",
      "--channel",
      "s3://bucket/chan",
      "--dry-run",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Would publish pwgen to s3://bucket/chan"))
    .stdout(predicate::str::contains("upload s3 --channel s3://bucket/chan"));

  assert_eq!(env.builder_calls("upload"), 0);
}

#[test]
fn publish_all_uploads_every_recorded_package() {
  let env = TestEnv::new();
  built(&env, &["alpha", "zeta"]);

  env
    .pkgctl_cmd()
    .args(["publish-all", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Published: 2"));

  assert_eq!(env.builder_calls("upload"), 2);
}

#[test]
fn publish_all_stops_after_failed_upload() {
  let env = TestEnv::new();
  built(&env, &["alpha", "zeta"]);

  env
    .pkgctl_cmd()
    .env("FAKE_UPLOAD_FAIL", "1")
    .args(["publish-all", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not attempted: zeta"));

  assert_eq!(env.builder_calls("upload"), 1);
}

#[test]
fn publish_all_with_empty_manifest() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args(["publish-all", "--platform", "linux-64", "--channel", "chan"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing recorded"));
}
