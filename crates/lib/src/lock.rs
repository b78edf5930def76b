//! Advisory file lock guarding the build manifest.
//!
//! The lock lives next to the manifest as `<manifest>.lock`. Readers take a
//! shared lock, read-modify-write cycles take an exclusive one. Acquisition
//! polls for a bounded time before giving up with a contention error naming
//! the holder.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::util::rfc3339;

/// How long to wait for a contended lock before failing.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
  Shared,
  Exclusive,
}

/// Written into the lock file by exclusive holders.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub pid: u32,
  pub started_at: String,
  pub command: String,
}

#[derive(Debug, Error)]
pub enum ManifestLockError {
  #[error(
    "manifest is locked by another process: {command} (PID {pid}, since {started_at})\n\
     if no pkgctl process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "manifest is locked by another process\n\
     if no pkgctl process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create directory for {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open lock file {path}: {source}")]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// Lock file path for a manifest.
pub fn lock_path_for(manifest: &Path) -> PathBuf {
  let mut name = manifest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".lock");
  manifest.with_file_name(name)
}

/// A held manifest lock. Released on drop.
#[derive(Debug)]
pub struct ManifestLock {
  file: File,
  lock_path: PathBuf,
  mode: LockMode,
}

impl ManifestLock {
  /// Acquire a lock on `manifest`, waiting up to [`DEFAULT_LOCK_WAIT`].
  pub fn acquire(manifest: &Path, mode: LockMode, command: &str) -> Result<Self, ManifestLockError> {
    Self::acquire_with_timeout(manifest, mode, command, DEFAULT_LOCK_WAIT)
  }

  pub fn acquire_with_timeout(
    manifest: &Path,
    mode: LockMode,
    command: &str,
    wait: Duration,
  ) -> Result<Self, ManifestLockError> {
    let lock_path = lock_path_for(manifest);
    if let Some(parent) = lock_path.parent()
      && !parent.as_os_str().is_empty()
      && !parent.exists()
    {
      std::fs::create_dir_all(parent).map_err(|source| ManifestLockError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(|source| ManifestLockError::OpenFile {
        path: lock_path.clone(),
        source,
      })?;

    let deadline = Instant::now() + wait;
    loop {
      match try_lock(&file, mode) {
        Ok(()) => break,
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
          if Instant::now() >= deadline {
            return Err(read_contention_error(&lock_path));
          }
          std::thread::sleep(POLL_INTERVAL);
        }
        Err(err) => return Err(ManifestLockError::LockFailed(err)),
      }
    }

    if mode == LockMode::Exclusive {
      write_metadata(&file, command)?;
    }
    debug!(path = %lock_path.display(), ?mode, "manifest lock acquired");

    Ok(Self { file, lock_path, mode })
  }

  /// Read back the metadata through the held handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  pub fn mode(&self) -> LockMode {
    self.mode
  }
}

fn write_metadata(file: &File, command: &str) -> Result<(), ManifestLockError> {
  let metadata = LockMetadata {
    pid: std::process::id(),
    started_at: rfc3339(SystemTime::now()),
    command: command.to_string(),
  };

  file.set_len(0).map_err(ManifestLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  writer.seek(SeekFrom::Start(0)).map_err(ManifestLockError::WriteMetadata)?;
  serde_json::to_writer(&mut writer, &metadata).map_err(|e| ManifestLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(ManifestLockError::WriteMetadata)?;
  Ok(())
}

/// Name the holder only when the recorded PID is still running. Shared
/// holders leave no metadata, so a dead PID belongs to an earlier exclusive
/// holder, not to whoever holds the lock now.
fn read_contention_error(lock_path: &Path) -> ManifestLockError {
  if let Ok(mut file) = File::open(lock_path) {
    let mut contents = String::new();
    if file.read_to_string(&mut contents).is_ok()
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      && process_alive(metadata.pid)
    {
      return ManifestLockError::Contention {
        command: metadata.command,
        pid: metadata.pid,
        started_at: metadata.started_at,
        lock_path: lock_path.to_path_buf(),
      };
    }
  }

  ManifestLockError::ContentionUnknown {
    lock_path: lock_path.to_path_buf(),
  }
}

#[cfg(unix)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = match mode {
    LockMode::Shared => FlockOperation::NonBlockingLockShared,
    LockMode::Exclusive => FlockOperation::NonBlockingLockExclusive,
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
  use rustix::io::Errno;
  use rustix::process::{Pid, test_kill_process};

  let Some(pid) = i32::try_from(pid).ok().and_then(Pid::from_raw) else {
    return false;
  };
  match test_kill_process(pid) {
    Ok(()) => true,
    // Exists, owned by another user.
    Err(e) => e == Errno::PERM,
  }
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
  use windows_sys::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, GetLastError, STILL_ACTIVE};
  use windows_sys::Win32::System::Threading::{GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

  // SAFETY: the handle is checked for null before use and closed before returning.
  unsafe {
    let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
    if handle.is_null() {
      return GetLastError() == ERROR_ACCESS_DENIED;
    }
    let mut code = 0u32;
    let queried = GetExitCodeProcess(handle, &mut code);
    CloseHandle(handle);
    queried != 0 && code == STILL_ACTIVE as u32
  }
}

#[cfg(windows)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = match mode {
    LockMode::Shared => LOCKFILE_FAIL_IMMEDIATELY,
    LockMode::Exclusive => LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
  };

  // SAFETY: OVERLAPPED is valid when zero-initialized and the handle is owned by `file`.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
      return Err(io::Error::from(io::ErrorKind::WouldBlock));
    }
    Err(err)
  } else {
    Ok(())
  }
}
