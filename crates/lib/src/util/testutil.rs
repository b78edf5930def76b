//! Test utilities for pkgctl-lib.
//!
//! Scripted command runners stand in for the builder, search and upload
//! tools; the fixture helpers lay out recipe trees and artifacts on disk.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::process::{CapturedOutput, CommandRunner, CommandSpec};

/// Returns a command that runs a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> CommandSpec {
  CommandSpec::new("/bin/sh").args(["-c", script])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> CommandSpec {
  CommandSpec::new("cmd.exe").args(["/C", script])
}

type Responder = Box<dyn Fn(&CommandSpec) -> io::Result<CapturedOutput> + Send>;

/// A `CommandRunner` that answers from a closure and records every call.
pub struct ScriptedRunner {
  respond: Responder,
  calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
  pub fn new<F>(respond: F) -> Self
  where
    F: Fn(&CommandSpec) -> io::Result<CapturedOutput> + Send + 'static,
  {
    Self {
      respond: Box::new(respond),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// A runner where every command exits with `code` and prints `text`.
  pub fn always(code: i32, text: &str) -> Self {
    let text = text.to_string();
    Self::new(move |_| Ok(CapturedOutput::new(Some(code), text.clone())))
  }

  pub fn calls(&self) -> Vec<CommandSpec> {
    self.calls.lock().unwrap().clone()
  }

  /// Calls whose first argument equals `subcommand`.
  pub fn calls_to(&self, subcommand: &str) -> Vec<CommandSpec> {
    self
      .calls()
      .into_iter()
      .filter(|c| c.args.first().map(String::as_str) == Some(subcommand))
      .collect()
  }
}

impl CommandRunner for ScriptedRunner {
  async fn run(&self, command: &CommandSpec) -> io::Result<CapturedOutput> {
    self.calls.lock().unwrap().push(command.clone());
    (self.respond)(command)
  }
}

/// Create `<recipes>/<name>/recipe.yaml`.
pub fn write_recipe(recipes: &Path, name: &str) -> PathBuf {
  let dir = recipes.join(name);
  std::fs::create_dir_all(&dir).unwrap();
  std::fs::write(dir.join("recipe.yaml"), format!("package:\n  name: {}\n", name)).unwrap();
  dir
}

/// Write an artifact file under `<root>/<platform>/` and return its path.
pub fn write_artifact(root: &Path, platform: &str, filename: &str, contents: &[u8]) -> PathBuf {
  let dir = root.join(platform);
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join(filename);
  std::fs::write(&path, contents).unwrap();
  path
}

/// Set a file's modification time to `secs_ago` seconds in the past.
pub fn age_file(path: &Path, secs_ago: u64) {
  let file = std::fs::File::options().write(true).open(path).unwrap();
  file
    .set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
    .unwrap();
}

/// A configuration rooted in `root` with default tool names and no extra
/// indices. Directories are not created.
pub fn test_config(root: &Path) -> Config {
  Config {
    recipes_dir: root.join("pkgs"),
    output_dir: root.join("output"),
    manifest_path: root.join("output").join("build-manifest.json"),
    channels: vec!["conda-forge".to_string()],
    public_channel: "conda-forge".to_string(),
    private_channel: None,
    s3_channel: None,
    s3_endpoint: None,
    s3_region: None,
    prefix_url: "https://prefix.dev".to_string(),
    publish_channel: None,
    build_tool: "rattler-build".to_string(),
    search_tool: "conda".to_string(),
    s3_tool: "aws".to_string(),
    query_timeout: Duration::from_secs(5),
  }
}
