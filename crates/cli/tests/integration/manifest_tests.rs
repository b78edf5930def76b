//! status and clean integration tests.

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
fn status_lists_recorded_builds() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("linux-64:"))
    .stdout(predicate::str::contains("pwgen (built, 8 B"))
    .stdout(predicate::str::contains("ago"));
}

#[test]
fn status_filters_by_platform() {
  let env = TestEnv::new();
  built(&env, &["pwgen"]);

  env
    .pkgctl_cmd()
    .args(["status", "--platform", "osx-arm64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No builds recorded"));
}

#[test]
fn status_json_flags_missing_artifacts() {
  let env = TestEnv::new();
  built(&env, &["alpha", "zeta"]);
  std::fs::remove_file(env.artifact_path("zeta")).unwrap();

  let output = env.pkgctl_cmd().args(["status", "--output", "json"]).output().unwrap();
  assert!(output.status.success());

  let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let entries = entries.as_array().unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0]["package"], "alpha");
  assert_eq!(entries[0]["artifactExists"], true);
  assert_eq!(entries[1]["package"], "zeta");
  assert_eq!(entries[1]["artifactExists"], false);
  assert_eq!(entries[1]["filename"], "zeta-1.0.0-h0.conda");
}

#[test]
fn clean_dry_run_then_clean() {
  let env = TestEnv::new();
  built(&env, &["alpha", "zeta"]);
  std::fs::remove_file(env.artifact_path("zeta")).unwrap();

  env
    .pkgctl_cmd()
    .args(["clean", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("linux-64/zeta"))
    .stdout(predicate::str::contains("Would remove 1"));
  assert!(env.manifest()["linux-64"].get("zeta").is_some());

  env
    .pkgctl_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed 1"));

  let manifest = env.manifest();
  assert!(manifest["linux-64"].get("zeta").is_none());
  assert!(manifest["linux-64"].get("alpha").is_some());
}
