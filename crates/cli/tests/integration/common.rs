//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Builder fake. `build` writes `<out>/<platform>/<name>-1.0.0-h0.conda`
/// unless the recipe dir holds a `FAIL` marker; `upload` succeeds unless
/// `FAKE_UPLOAD_FAIL` is set.
const FAKE_BUILD: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_LOG"
sub="$1"
shift
recipe=""
out=""
plat=""
while [ $# -gt 0 ]; do
  case "$1" in
    --recipe-dir) recipe="$2"; shift ;;
    --output-dir) out="$2"; shift ;;
    --target-platform=*) plat="${1#--target-platform=}" ;;
  esac
  shift
done
case "$sub" in
  build)
    name=$(basename "$recipe")
    if [ -f "$recipe/FAIL" ]; then
      echo "compiling $name"
      echo "error: compilation failed"
      exit 1
    fi
    mkdir -p "$out/$plat"
    artifact="$out/$plat/$name-1.0.0-h0.conda"
    echo "archive" > "$artifact"
    echo "Packaging $name"
    echo "Archive written to '$artifact'"
    ;;
  upload)
    if [ -n "$FAKE_UPLOAD_FAIL" ]; then
      echo "Uploading..."
      echo "error: 401 Unauthorized"
      exit 1
    fi
    echo "Upload complete"
    ;;
esac
"#;

/// Search fake. Reports nothing unless `FAKE_SEARCH_HIT` names the package.
const FAKE_SEARCH: &str = r##"#!/bin/sh
echo "search $*" >> "$FAKE_LOG"
for last; do :; done
name="${last%%=*}"
echo "Loading channels: done"
if [ "$FAKE_SEARCH_HIT" = "$name" ]; then
  echo "# Name   Version   Build   Channel"
  echo "$name    1.0.0     h0_1    conda-forge"
else
  echo "No match found for: $name."
fi
"##;

/// Object-storage CLI fake: `s3 rm` succeeds, `s3 cp` writes an empty index.
const FAKE_AWS: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_LOG"
case "$2" in
  rm) echo "delete: $3" ;;
  cp) echo '{"packages.conda": {}}' > "$4" ;;
esac
"#;

/// Isolated workspace with fake tools on disk.
///
/// Each test gets its own recipes dir, output dir and tool log; nothing from
/// the caller's environment leaks into the spawned binary.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };
    std::fs::create_dir_all(env.recipes_dir()).unwrap();
    env.write_tool("fake-build", FAKE_BUILD);
    env.write_tool("fake-search", FAKE_SEARCH);
    env.write_tool("fake-aws", FAKE_AWS);
    env
  }

  fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap_or_else(|_| self.temp.path().to_path_buf())
  }

  fn write_tool(&self, name: &str, script: &str) {
    let path = self.bin_dir().join(name);
    std::fs::create_dir_all(self.bin_dir()).unwrap();
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn bin_dir(&self) -> PathBuf {
    self.root().join("bin")
  }

  pub fn recipes_dir(&self) -> PathBuf {
    self.root().join("pkgs")
  }

  pub fn output_dir(&self) -> PathBuf {
    self.root().join("output")
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.output_dir().join("build-manifest.json")
  }

  pub fn log_path(&self) -> PathBuf {
    self.root().join("tools.log")
  }

  /// Add `<recipes>/<name>/recipe.yaml`.
  pub fn add_recipe(&self, name: &str) -> PathBuf {
    let dir = self.recipes_dir().join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("recipe.yaml"), format!("package:\n  name: {}\n", name)).unwrap();
    dir
  }

  /// Add a recipe the fake builder refuses to build.
  pub fn add_failing_recipe(&self, name: &str) {
    let dir = self.add_recipe(name);
    std::fs::write(dir.join("FAIL"), "").unwrap();
  }

  pub fn artifact_path(&self, name: &str) -> PathBuf {
    self.output_dir().join("linux-64").join(format!("{}-1.0.0-h0.conda", name))
  }

  /// Every line the fake tools logged.
  pub fn tool_calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.log_path())
      .unwrap_or_default()
      .lines()
      .map(String::from)
      .collect()
  }

  /// Logged builder calls of one subcommand (`build`, `upload`).
  pub fn builder_calls(&self, subcommand: &str) -> usize {
    let prefix = format!("{} ", subcommand);
    self.tool_calls().iter().filter(|l| l.starts_with(&prefix)).count()
  }

  pub fn manifest(&self) -> serde_json::Value {
    let content = std::fs::read_to_string(self.manifest_path()).unwrap();
    serde_json::from_str(&content).unwrap()
  }

  /// A pkgctl command with a clean environment pointing at this workspace.
  pub fn pkgctl_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("pkgctl");
    cmd.env_clear();
    if let Some(path) = std::env::var_os("PATH") {
      cmd.env("PATH", path);
    }
    cmd.env("HOME", self.root());
    cmd.env("XDG_CONFIG_HOME", self.root().join("config"));
    cmd.env("PKGCTL_RECIPES_DIR", self.recipes_dir());
    cmd.env("PKGCTL_OUTPUT_DIR", self.output_dir());
    cmd.env("PKGCTL_BUILD_TOOL", self.bin_dir().join("fake-build"));
    cmd.env("PKGCTL_SEARCH_TOOL", self.bin_dir().join("fake-search"));
    cmd.env("PKGCTL_S3_TOOL", self.bin_dir().join("fake-aws"));
    cmd.env("PKGCTL_QUERY_TIMEOUT", "10");
    cmd.env("FAKE_LOG", self.log_path());
    cmd.current_dir(self.root());
    cmd
  }
}
