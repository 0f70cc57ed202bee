//! Single-instance process lock.
//!
//! The lock is a file holding the owner's decimal PID. Acquiring returns a
//! [`LockGuard`] that deletes the file when dropped, so the lock is released
//! on every exit path of a run, including early returns and panics. A process
//! killed before it can drop the guard leaves a stale file behind; the next
//! run notices the PID is dead and reclaims it (see [`ProcessLock::acquire`]).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sysinfo::{Pid, ProcessesToUpdate, System};
use thiserror::Error;

/// How many stale locks `acquire` will reclaim before giving up.
const MAX_RECLAIMS: usize = 8;

/// Errors produced while taking the process lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// A live process already owns the lock.
    #[error("another instance is already running (pid {pid})")]
    Contended { pid: u32 },
    /// The lock file could not be read, created, or removed.
    #[error("lock file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    /// The lock kept reappearing while stale locks were reclaimed.
    #[error("could not acquire lock {path} after {attempts} attempts")]
    Unstable { path: String, attempts: usize },
}

/// Answers whether a PID belongs to a running process.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// [`ProcessProbe`] backed by the operating system process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).is_some()
    }
}

/// File-based mutual exclusion between wallfetch processes on one host.
pub struct ProcessLock {
    path: PathBuf,
    pid: u32,
    probe: Box<dyn ProcessProbe>,
}

impl std::fmt::Debug for ProcessLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessLock").field("path", &self.path).field("pid", &self.pid).finish()
    }
}

impl ProcessLock {
    /// Lock at `path` for the current process.
    #[must_use]
    pub fn new(path: PathBuf) -> Self { Self::with_probe(path, std::process::id(), Box::new(SystemProbe)) }

    /// Lock at `path` owned by `pid`, checking liveness with `probe`.
    #[must_use]
    pub fn with_probe(path: PathBuf, pid: u32, probe: Box<dyn ProcessProbe>) -> Self {
        Self { path, pid, probe }
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Takes the lock.
    ///
    /// Holding the lock already (the file names our own PID) counts as
    /// success. A lock naming a dead process, or holding anything that is not
    /// a PID, is removed and acquisition starts over.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Contended` if a live process owns the lock, or
    /// `LockError::Io` if the lock file cannot be handled.
    pub fn acquire(&self) -> Result<LockGuard<'_>, LockError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        for _ in 0..MAX_RECLAIMS {
            match OpenOptions::new().write(true).create_new(true).open(&self.path) {
                Ok(mut file) => {
                    file.write_all(self.pid.to_string().as_bytes())
                        .and_then(|()| file.sync_all())
                        .map_err(|source| self.io_error(source))?;
                    tracing::debug!(path = %self.path.display(), pid = self.pid, "lock acquired");
                    return Ok(LockGuard { lock: self });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(self.io_error(source)),
            }

            let contents = match fs::read_to_string(&self.path) {
                Ok(contents) => contents,
                // Released between our create attempt and the read.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(self.io_error(source)),
            };

            match contents.trim().parse::<u32>() {
                Ok(owner) if owner == self.pid => return Ok(LockGuard { lock: self }),
                Ok(owner) if self.probe.is_alive(owner) => {
                    return Err(LockError::Contended { pid: owner });
                }
                Ok(owner) => {
                    tracing::warn!(path = %self.path.display(), pid = owner, "removing stale lock");
                }
                Err(_) => {
                    tracing::warn!(path = %self.path.display(), "removing unreadable lock");
                }
            }

            self.reclaim(&contents)?;
        }

        Err(LockError::Unstable { path: self.path.display().to_string(), attempts: MAX_RECLAIMS })
    }

    /// Deletes the lock file regardless of who owns it.
    pub fn release(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "lock released"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to release lock");
            }
        }
    }

    /// PID recorded in the lock file, if there is one.
    #[must_use]
    pub fn holder(&self) -> Option<u32> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    /// PID recorded in the lock file, if that process is still running.
    #[must_use]
    pub fn live_holder(&self) -> Option<u32> { self.holder().filter(|&pid| self.probe.is_alive(pid)) }

    /// Removes a stale lock, provided it still holds `expected`.
    ///
    /// The file is first renamed to a name private to this process, so two
    /// instances reclaiming the same stale lock cannot both delete it. If the
    /// moved file turns out to be a fresh lock written by another instance in
    /// the meantime, it is linked back into place without overwriting. A third
    /// instance creating the lock inside that short window would still race.
    fn reclaim(&self, expected: &str) -> Result<(), LockError> {
        let aside = self.path.with_extension(format!("stale.{}", self.pid));
        match fs::rename(&self.path, &aside) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(self.io_error(source)),
        }

        let moved = fs::read_to_string(&aside).map_err(|source| self.io_error(source))?;
        if moved != expected {
            tracing::debug!(path = %self.path.display(), "lock changed hands while reclaiming, restoring it");
            if let Err(err) = fs::hard_link(&aside, &self.path)
                && err.kind() != io::ErrorKind::AlreadyExists
            {
                let _ = fs::remove_file(&aside);
                return Err(self.io_error(err));
            }
        }

        fs::remove_file(&aside).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> LockError {
        LockError::Io { path: self.path.display().to_string(), source }
    }
}

/// Proof of holding a [`ProcessLock`]. Releases it when dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a ProcessLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) { self.lock.release(); }
}
