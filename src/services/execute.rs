//! Apply retention decisions to the filesystem
//!
//! Every removal happens immediately and on its own. Targets that disappeared
//! since the scan count as removed; any other I/O failure is returned and
//! aborts the run.

use crate::models::{FileEntry, Timestamp};
use crate::services::format::age_days;
use crate::services::retention::{MailboxVerdict, RetentionDecision};
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Quota usage cache the mail server rebuilds lazily once deleted.
pub const QUOTA_CACHE_FILE: &str = "maildirsize";

/// Attempts at removing a mailbox tree that keeps receiving files.
const PURGE_ATTEMPTS: u32 = 10;

/// Pause before retry `n` is `n` times this.
const PURGE_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecMode {
    /// Report what would be removed, touch nothing.
    Preview,
    Destructive,
}

/// Counters for one executor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpiryStats {
    pub mailboxes_purged: u64,
    pub messages_removed: u64,
    pub bytes_freed: u64,
    pub vanished: u64,
}

/// Applies decisions and writes one record line per action to `out`.
///
/// `apply` takes `&self` so one executor can be shared by worker threads.
pub struct Executor<W: Write> {
    mode: ExecMode,
    now: Timestamp,
    out: Mutex<W>,
    mailboxes_purged: AtomicU64,
    messages_removed: AtomicU64,
    bytes_freed: AtomicU64,
    vanished: AtomicU64,
}

impl<W: Write> Executor<W> {
    #[must_use]
    pub fn new(mode: ExecMode, now: Timestamp, out: W) -> Self {
        Self {
            mode,
            now,
            out: Mutex::new(out),
            mailboxes_purged: AtomicU64::new(0),
            messages_removed: AtomicU64::new(0),
            bytes_freed: AtomicU64::new(0),
            vanished: AtomicU64::new(0),
        }
    }

    pub fn apply(&self, decision: &RetentionDecision) -> Result<()> {
        let dir = decision.mailbox_dir();
        match decision.verdict() {
            MailboxVerdict::PurgeWhole { .. } => self.purge_mailbox(dir),
            MailboxVerdict::EvaluateMessages { .. } => {
                for message in decision.deletions() {
                    self.remove_message(dir, &message.entry)?;
                }
                if decision.changed() {
                    self.invalidate_quota_cache(dir)?;
                }
                Ok(())
            }
        }
    }

    fn purge_mailbox(&self, dir: &Path) -> Result<()> {
        self.record(format_args!("removing mailbox {}", dir.display()))?;
        if self.mode == ExecMode::Destructive && !remove_tree(dir)? {
            self.vanished(dir)?;
            return Ok(());
        }
        self.mailboxes_purged.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn remove_message(&self, dir: &Path, message: &FileEntry) -> Result<()> {
        let path = dir.join(message.relpath());
        self.record(format_args!(
            "removing {}d {}K {}",
            age_days(self.now, message.mtime()),
            message.size().div_ceil(1000),
            path.display()
        ))?;

        if self.mode == ExecMode::Destructive {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    self.vanished(&path)?;
                    return Ok(());
                }
                Err(err) => {
                    log::error!("Failed to remove {}: {err}", path.display());
                    return Err(err.into());
                }
            }
        }

        self.messages_removed.fetch_add(1, Ordering::Relaxed);
        self.bytes_freed.fetch_add(message.size(), Ordering::Relaxed);
        Ok(())
    }

    fn invalidate_quota_cache(&self, dir: &Path) -> Result<()> {
        let path = dir.join(QUOTA_CACHE_FILE);
        self.record(format_args!("removing {}", path.display()))?;
        if self.mode == ExecMode::Preview {
            return Ok(());
        }
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("Invalidated quota cache {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No quota cache at {}", path.display());
            }
            Err(err) => {
                log::error!("Failed to remove {}: {err}", path.display());
                return Err(err.into());
            }
        }
        Ok(())
    }

    fn vanished(&self, path: &Path) -> Result<()> {
        log::info!("file not found/vanished {}", path.display());
        self.vanished.fetch_add(1, Ordering::Relaxed);
        self.record(format_args!("file not found/vanished {}", path.display()))
    }

    fn record(&self, line: fmt::Arguments<'_>) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_fmt(line)?;
        out.write_all(b"\n")?;
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> ExpiryStats {
        ExpiryStats {
            mailboxes_purged: self.mailboxes_purged.load(Ordering::Relaxed),
            messages_removed: self.messages_removed.load(Ordering::Relaxed),
            bytes_freed: self.bytes_freed.load(Ordering::Relaxed),
            vanished: self.vanished.load(Ordering::Relaxed),
        }
    }

    /// Recover the record sink, e.g. to inspect captured output.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remove a directory tree; `Ok(false)` if it was already gone.
///
/// Mail delivered while the tree is being removed makes a pass fail with
/// "directory not empty"; a child removed concurrently makes it fail with
/// "not found". Both are retried with a growing pause while the root exists.
fn remove_tree(dir: &Path) -> io::Result<bool> {
    let mut attempt = 1;
    loop {
        let err = match fs::remove_dir_all(dir) {
            Ok(()) => return Ok(true),
            Err(err) => err,
        };
        match err.kind() {
            io::ErrorKind::NotFound if fs::symlink_metadata(dir).is_err() => {
                return Ok(attempt > 1);
            }
            io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty if attempt < PURGE_ATTEMPTS => {
                log::debug!("Retrying removal of {} after: {err}", dir.display());
                thread::sleep(PURGE_BACKOFF * attempt);
            }
            _ => {
                log::error!("Failed to remove mailbox {}: {err}", dir.display());
                return Err(err);
            }
        }
        attempt += 1;
    }
}
