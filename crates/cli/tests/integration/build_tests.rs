//! build and build-all integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_records_artifact_then_skips_on_rerun() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  env
    .pkgctl_cmd()
    .args(["build", "pwgen", "--platform", "linux-64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Built pwgen for linux-64"));

  assert!(env.artifact_path("pwgen").is_file());
  let manifest = env.manifest();
  let record = &manifest["linux-64"]["pwgen"];
  assert_eq!(record["status"], "built");
  assert_eq!(record["filename"], "pwgen-1.0.0-h0.conda");
  assert_eq!(record["sizeBytes"], 8);

  env
    .pkgctl_cmd()
    .args(["build", "pwgen", "--platform", "linux-64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("already available"))
    .stdout(predicate::str::contains("local"));

  assert_eq!(env.builder_calls("build"), 1);
  assert_eq!(env.manifest()["linux-64"]["pwgen"]["status"], "skipped");
}

#[test]
fn build_dry_run_leaves_no_trace() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  env
    .pkgctl_cmd()
    .args(["build", "pwgen", "--platform", "linux-64", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Would build pwgen"))
    .stdout(predicate::str::contains("--target-platform=linux-64"));

  assert_eq!(env.builder_calls("build"), 0);
  assert!(!env.manifest_path().exists());
}

#[test]
fn remote_hit_skips_without_recording() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  env
    .pkgctl_cmd()
    .env("FAKE_SEARCH_HIT", "pwgen")
    .args(["build", "pwgen", "--platform", "linux-64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("already available"))
    .stdout(predicate::str::contains("public"));

  assert_eq!(env.builder_calls("build"), 0);
  assert!(!env.manifest_path().exists());
}

#[test]
fn local_policy_never_searches_remotes() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  env
    .pkgctl_cmd()
    .env("FAKE_SEARCH_HIT", "pwgen")
    .args(["build", "pwgen", "--platform", "linux-64", "--skip-existing", "local"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Built pwgen"));

  assert_eq!(env.builder_calls("search"), 0);
  assert_eq!(env.builder_calls("build"), 1);
}

#[test]
fn force_rebuilds_existing_package() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  for _ in 0..2 {
    env
      .pkgctl_cmd()
      .args(["build", "pwgen", "--platform", "linux-64", "--force"])
      .assert()
      .success()
      .stdout(predicate::str::contains("Built pwgen"));
  }

  assert_eq!(env.builder_calls("build"), 2);
  assert_eq!(env.builder_calls("search"), 0);
}

#[test]
fn builder_failure_shows_its_output() {
  let env = TestEnv::new();
  env.add_failing_recipe("broken");

  env
    .pkgctl_cmd()
    .args(["build", "broken", "--platform", "linux-64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("'broken' on linux-64"))
    .stderr(predicate::str::contains("error: compilation failed"));

  assert!(!env.manifest_path().exists());
}

#[test]
fn unknown_package_points_at_list() {
  let env = TestEnv::new();

  env
    .pkgctl_cmd()
    .args(["build", "nope", "--platform", "linux-64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no recipe for 'nope'"))
    .stderr(predicate::str::contains("pkgctl list"));
}

#[test]
fn build_json_output() {
  let env = TestEnv::new();
  env.add_recipe("pwgen");

  let output = env
    .pkgctl_cmd()
    .args(["build", "pwgen", "--platform", "linux-64", "--output", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["package"], "pwgen");
  assert_eq!(report["policy"], "all");
  assert_eq!(report["outcome"]["status"], "built");
  assert_eq!(report["outcome"]["record"]["filename"], "pwgen-1.0.0-h0.conda");
  let sources: Vec<&str> = report["checks"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["sourceId"].as_str().unwrap())
    .collect();
  assert_eq!(sources, vec!["local", "public"]);
}

#[test]
fn build_all_stops_at_first_failure() {
  let env = TestEnv::new();
  env.add_recipe("alpha");
  env.add_failing_recipe("broken");
  env.add_recipe("zeta");

  env
    .pkgctl_cmd()
    .args(["build-all", "--platform", "linux-64"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not attempted: zeta"));

  assert!(env.artifact_path("alpha").is_file());
  assert!(!env.artifact_path("zeta").exists());
  assert!(env.manifest()["linux-64"].get("zeta").is_none());
}

#[test]
fn build_all_continue_on_error_builds_the_rest() {
  let env = TestEnv::new();
  env.add_recipe("alpha");
  env.add_failing_recipe("broken");
  env.add_recipe("zeta");

  env
    .pkgctl_cmd()
    .args(["build-all", "--platform", "linux-64", "--continue-on-error"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Built: 2"))
    .stdout(predicate::str::contains("Failed: 1"))
    .stderr(predicate::str::contains("broken"));

  let manifest = env.manifest();
  assert_eq!(manifest["linux-64"]["alpha"]["status"], "built");
  assert_eq!(manifest["linux-64"]["zeta"]["status"], "built");
  assert!(manifest["linux-64"].get("broken").is_none());
}
