pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;
use std::str::FromStr;

use arch::Arch;
use os::Os;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Conda platform subdir (e.g., "linux-64", "osx-arm64").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
  Linux64,
  LinuxAarch64,
  LinuxPpc64le,
  Osx64,
  OsxArm64,
  Win64,
  NoArch,
}

#[derive(Debug, Error)]
#[error("unknown platform '{0}' (expected one of: {known})", known = Platform::ALL.map(|p| p.as_str()).join(", "))]
pub struct PlatformParseError(pub String);

impl Platform {
  pub const ALL: [Platform; 7] = [
    Platform::Linux64,
    Platform::LinuxAarch64,
    Platform::LinuxPpc64le,
    Platform::Osx64,
    Platform::OsxArm64,
    Platform::Win64,
    Platform::NoArch,
  ];

  /// Map an architecture/OS pair to its subdir, if conda has one.
  pub fn new(arch: Arch, os: Os) -> Option<Self> {
    match (os, arch) {
      (Os::Linux, Arch::X86_64) => Some(Self::Linux64),
      (Os::Linux, Arch::Aarch64) => Some(Self::LinuxAarch64),
      (Os::Linux, Arch::Ppc64le) => Some(Self::LinuxPpc64le),
      (Os::MacOs, Arch::X86_64) => Some(Self::Osx64),
      (Os::MacOs, Arch::Aarch64) => Some(Self::OsxArm64),
      (Os::Windows, Arch::X86_64) => Some(Self::Win64),
      _ => None,
    }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture has no conda subdir
  pub fn current() -> Option<Self> {
    Self::for_host(Arch::current()?, Os::current()?)
  }

  fn for_host(arch: Arch, os: Os) -> Option<Self> {
    let platform = Self::new(arch, os);
    if platform.is_none() {
      debug!(%os, %arch, "host has no conda subdir");
    }
    platform
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux64 => "linux-64",
      Self::LinuxAarch64 => "linux-aarch64",
      Self::LinuxPpc64le => "linux-ppc64le",
      Self::Osx64 => "osx-64",
      Self::OsxArm64 => "osx-arm64",
      Self::Win64 => "win-64",
      Self::NoArch => "noarch",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Platform {
  type Err = PlatformParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|p| p.as_str() == s)
      .ok_or_else(|| PlatformParseError(s.to_string()))
  }
}

impl TryFrom<String> for Platform {
  type Error = PlatformParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Platform> for String {
  fn from(value: Platform) -> Self {
    value.as_str().to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_test::traced_test;

  #[test]
  fn subdir_format() {
    assert_eq!(Platform::new(Arch::Aarch64, Os::MacOs), Some(Platform::OsxArm64));
    assert_eq!(Platform::new(Arch::X86_64, Os::Linux).unwrap().as_str(), "linux-64");
    assert_eq!(Platform::new(Arch::Ppc64le, Os::Windows), None);
  }

  #[test]
  #[traced_test]
  fn unsupported_host_names_os_and_arch() {
    assert_eq!(Platform::for_host(Arch::Ppc64le, Os::Windows), None);
    assert!(logs_contain("os=win arch=ppc64le"));
  }

  #[test]
  fn parse_roundtrips_every_subdir() {
    for platform in Platform::ALL {
      assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
    }
  }

  #[test]
  fn parse_rejects_unknown_subdir() {
    let err = "linux-32".parse::<Platform>().unwrap_err();
    assert!(err.to_string().contains("linux-32"));
    assert!(err.to_string().contains("osx-arm64"));
  }
}
