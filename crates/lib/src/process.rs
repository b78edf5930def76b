//! Result capture for external tools.
//!
//! Every subprocess this crate starts (builder, search, upload, object-storage
//! CLI) is described by a [`CommandSpec`] and executed through a
//! [`CommandRunner`]. The only thing callers get back is the exit code and the
//! combined text output, which keeps parsing concerns in the modules that own
//! them and lets tests substitute scripted runners.

use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

/// A fully described external command.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  /// Extra environment for the child. Values may hold secrets and are never
  /// included in `Display` or `Debug` output.
  pub env: Vec<(String, String)>,
  /// Upper bound on the run time. `None` waits indefinitely.
  pub timeout: Option<Duration>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      env: Vec::new(),
      timeout: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Names of the environment variables passed to the child.
  pub fn env_keys(&self) -> impl Iterator<Item = &str> {
    self.env.iter().map(|(k, _)| k.as_str())
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.program)?;
    for arg in &self.args {
      if arg.is_empty() || arg.contains(char::is_whitespace) {
        write!(f, " '{}'", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

impl fmt::Debug for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CommandSpec")
      .field("program", &self.program)
      .field("args", &self.args)
      .field("env", &self.env_keys().collect::<Vec<_>>())
      .field("timeout", &self.timeout)
      .finish()
  }
}

/// Exit status and combined stdout+stderr text of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
  /// Exit code, `None` when the process was killed by a signal.
  pub code: Option<i32>,
  pub text: String,
}

impl CapturedOutput {
  pub fn new(code: Option<i32>, text: impl Into<String>) -> Self {
    Self {
      code,
      text: text.into(),
    }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// The last `n` non-empty lines, oldest first.
  pub fn tail(&self, n: usize) -> Vec<&str> {
    let mut lines: Vec<&str> = self.text.lines().filter(|l| !l.trim().is_empty()).rev().take(n).collect();
    lines.reverse();
    lines
  }
}

/// Runs external commands and captures their output.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
  /// Run the command to completion.
  ///
  /// A non-zero exit is reported through [`CapturedOutput::code`], not as an
  /// error. Errors mean the command could not be started or timed out.
  async fn run(&self, command: &CommandSpec) -> io::Result<CapturedOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  async fn run(&self, spec: &CommandSpec) -> io::Result<CapturedOutput> {
    debug!(command = %spec, env = ?spec.env_keys().collect::<Vec<_>>(), "spawning process");

    let mut command = Command::new(&spec.program);
    command
      .args(&spec.args)
      .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .stdin(Stdio::null())
      .kill_on_drop(true);

    let output = match spec.timeout {
      Some(limit) => tokio::time::timeout(limit, command.output()).await.map_err(|_| {
        io::Error::new(
          io::ErrorKind::TimedOut,
          format!("'{}' did not finish within {}s", spec.program, limit.as_secs()),
        )
      })??,
      None => command.output().await?,
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
      }
      text.push_str(&stderr);
    }

    debug!(program = %spec.program, code = ?output.status.code(), bytes = text.len(), "process finished");

    Ok(CapturedOutput {
      code: output.status.code(),
      text,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::shell_cmd;

  #[tokio::test]
  #[cfg(unix)]
  async fn captures_stdout_and_stderr() {
    let spec = shell_cmd("echo out; echo err 1>&2");
    let output = SystemRunner.run(&spec).await.unwrap();

    assert!(output.success());
    assert_eq!(output.text, "out\nerr\n");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn non_zero_exit_is_not_an_error() {
    let output = SystemRunner.run(&shell_cmd("echo boom; exit 3")).await.unwrap();

    assert_eq!(output.code, Some(3));
    assert!(!output.success());
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn passes_extra_environment() {
    let spec = shell_cmd("echo \"$PKGCTL_TEST_VALUE\"").env("PKGCTL_TEST_VALUE", "hello");
    let output = SystemRunner.run(&spec).await.unwrap();

    assert_eq!(output.text.trim(), "hello");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn timeout_kills_slow_command() {
    let spec = shell_cmd("sleep 5").timeout(Duration::from_millis(100));
    let err = SystemRunner.run(&spec).await.unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
  }

  #[tokio::test]
  async fn missing_program_is_an_error() {
    let spec = CommandSpec::new("pkgctl-definitely-not-a-real-program");
    assert!(SystemRunner.run(&spec).await.is_err());
  }

  #[test]
  fn display_quotes_arguments_with_spaces() {
    let spec = CommandSpec::new("tool").args(["upload", "my file.conda"]);
    assert_eq!(spec.to_string(), "tool upload 'my file.conda'");
  }

  #[test]
  fn debug_hides_environment_values() {
    let spec = CommandSpec::new("tool").env("PREFIX_API_KEY", "secret-token");
    let rendered = format!("{:?}", spec);
    assert!(rendered.contains("PREFIX_API_KEY"));
    assert!(!rendered.contains("secret-token"));
  }

  #[test]
  fn tail_skips_blank_lines() {
    let output = CapturedOutput::new(Some(1), "a\n\nb\nc\n\n");
    assert_eq!(output.tail(2), vec!["b", "c"]);
  }
}
