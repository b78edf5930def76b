use std::fmt;

/// Operating system variants that have a conda subdir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the prefix conda uses for this OS in subdir names
  pub fn subdir_prefix(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "osx",
      Self::Windows => "win",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.subdir_prefix())
  }
}
