//! Confirmation prompt for destructive commands.

use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask a yes/no question on stderr; anything but `y`/`yes` is a no.
///
/// `force` answers yes without asking. Without a terminal the question
/// cannot be answered, so that is an error rather than a silent no.
pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Refusing to delete without confirmation in a non-interactive session; pass --force to proceed");
  }

  let mut stderr = io::stderr().lock();
  write!(stderr, "{} [y/N] ", message)?;
  stderr.flush()?;

  let mut answer = String::new();
  io::stdin()
    .lock()
    .read_line(&mut answer)
    .context("Failed to read confirmation")?;

  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
