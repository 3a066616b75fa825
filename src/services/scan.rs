//! Mailbox discovery and maildir scanning
//!
//! A mailbox directory is any child of the base directory whose name contains
//! `@`. Inside a mailbox:
//!
//! - `cur`, `new` and `tmp` hold messages, one level deep.
//! - Any other subdirectory is a client folder and is walked for its own
//!   `cur`/`new`/`tmp` leaves, at any depth up to [`MAX_FOLDER_DEPTH`].
//! - Top-level regular files are extra files (`password`, `maildirsize`,
//!   dovecot index files, ...).
//!
//! The live mail server keeps writing while we scan, so an entry that vanishes
//! between listing and stat is dropped silently.

use crate::models::{ErrorItem, FileEntry, MailboxSnapshot, MaildirKind};
use crate::services::metadata::{logical_size, mtime};
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Nesting limit for client folders below the mailbox top level.
pub const MAX_FOLDER_DEPTH: usize = 8;

/// Result of scanning every mailbox under a base directory
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub snapshots: Vec<MailboxSnapshot>,
    pub errors: Vec<ErrorItem>,
}

/// Enumerates and scans the mailbox directories below one base directory.
#[derive(Debug, Clone)]
pub struct Scanner {
    base_dir: PathBuf,
    max_count: Option<usize>,
}

impl Scanner {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_count: None,
        }
    }

    /// Only consider the first `max_count` directory entries.
    #[must_use]
    pub fn with_max_count(mut self, max_count: Option<usize>) -> Self {
        self.max_count = max_count;
        self
    }

    /// List mailbox directories in directory-listing order.
    ///
    /// The `max_count` cap applies to raw listing entries, before non-mailbox
    /// names are filtered out.
    pub fn mailbox_dirs(&self) -> Result<Vec<PathBuf>> {
        let base = &self.base_dir;
        if !base.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Mailboxes directory does not exist: {}",
                base.display()
            )));
        }

        let limit = self.max_count.unwrap_or(usize::MAX);
        let mut dirs = Vec::new();
        for entry in fs::read_dir(base)?.take(limit) {
            let entry = entry?;
            let name = entry.file_name();
            if !name.to_string_lossy().contains('@') {
                log::debug!("Skipping non-mailbox entry {}", entry.path().display());
                continue;
            }
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => dirs.push(entry.path()),
                Ok(_) => log::debug!("Skipping non-directory {}", entry.path().display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    log::debug!("Mailbox vanished before scan: {}", entry.path().display());
                }
                Err(err) => return Err(err.into()),
            }
        }

        log::debug!("Found {} mailbox directories in {}", dirs.len(), base.display());
        Ok(dirs)
    }

    /// Scan all mailboxes sequentially.
    ///
    /// Mailboxes that cannot be read are skipped and recorded in
    /// [`ScanSummary::errors`]; only an unreadable base directory fails.
    pub fn scan(&self) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        for dir in self.mailbox_dirs()? {
            match scan_mailbox(&dir) {
                Ok(snapshot) => summary.snapshots.push(snapshot),
                Err(err) => {
                    if let Some(item) = skipped_mailbox(&dir, &err) {
                        summary.errors.push(item);
                    }
                }
            }
        }
        Ok(summary)
    }
}

/// Log a mailbox that failed to scan and describe it, unless it simply vanished.
pub(crate) fn skipped_mailbox(dir: &Path, err: &io::Error) -> Option<ErrorItem> {
    if err.kind() == io::ErrorKind::NotFound {
        log::info!("mailbox not found/vanished {}", dir.display());
        return None;
    }
    log::warn!("Skipping unreadable mailbox {}: {err}", dir.display());
    Some(ErrorItem::from_io(dir, err))
}

/// Build a fresh snapshot of one mailbox directory.
pub fn scan_mailbox(dir: &Path) -> io::Result<MailboxSnapshot> {
    let mut messages = Vec::new();
    let mut extra_files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let Some(entry) = tolerate_vanished(entry)? else {
            continue;
        };
        let Some(name) = utf8_name(&entry) else {
            continue;
        };
        let Some(file_type) = tolerate_vanished(entry.file_type())? else {
            continue;
        };
        let path = entry.path();

        if file_type.is_dir() {
            if MaildirKind::from_dir_name(&name).is_some() {
                collect_leaf(&path, &name, &mut messages)?;
            } else {
                walk_folder(&path, &name, 1, &mut messages)?;
            }
        } else if file_type.is_file()
            && let Some(extra) = stat_file(&path, name)?
        {
            extra_files.push(extra);
        }
    }

    log::debug!(
        "Scanned {}: {} messages, {} extra files",
        dir.display(),
        messages.len(),
        extra_files.len()
    );
    Ok(MailboxSnapshot::new(dir.to_path_buf(), messages, extra_files))
}

/// Collect the regular files directly inside a `cur`/`new`/`tmp` directory.
fn collect_leaf(dir: &Path, relprefix: &str, out: &mut Vec<FileEntry>) -> io::Result<()> {
    let Some(listing) = tolerate_vanished(fs::read_dir(dir))? else {
        return Ok(());
    };
    for entry in listing {
        let Some(entry) = tolerate_vanished(entry)? else {
            continue;
        };
        let Some(name) = utf8_name(&entry) else {
            continue;
        };
        let Some(file_type) = tolerate_vanished(entry.file_type())? else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        if let Some(message) = stat_file(&entry.path(), format!("{relprefix}/{name}"))? {
            out.push(message);
        }
    }
    Ok(())
}

/// Walk a client folder looking for maildir leaves beneath it.
fn walk_folder(dir: &Path, relprefix: &str, depth: usize, out: &mut Vec<FileEntry>) -> io::Result<()> {
    if depth > MAX_FOLDER_DEPTH {
        log::debug!("Folder nesting too deep, not descending: {}", dir.display());
        return Ok(());
    }
    let Some(listing) = tolerate_vanished(fs::read_dir(dir))? else {
        return Ok(());
    };
    for entry in listing {
        let Some(entry) = tolerate_vanished(entry)? else {
            continue;
        };
        let Some(name) = utf8_name(&entry) else {
            continue;
        };
        let Some(file_type) = tolerate_vanished(entry.file_type())? else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let child_prefix = format!("{relprefix}/{name}");
        if MaildirKind::from_dir_name(&name).is_some() {
            collect_leaf(&entry.path(), &child_prefix, out)?;
        } else {
            walk_folder(&entry.path(), &child_prefix, depth + 1, out)?;
        }
    }
    Ok(())
}

/// Stat a regular file without following symlinks.
fn stat_file(path: &Path, relpath: String) -> io::Result<Option<FileEntry>> {
    let Some(metadata) = tolerate_vanished(fs::symlink_metadata(path))? else {
        log::debug!("File vanished during scan: {}", path.display());
        return Ok(None);
    };
    if !metadata.is_file() {
        return Ok(None);
    }
    Ok(Some(FileEntry::new(
        relpath,
        mtime(&metadata),
        logical_size(&metadata),
    )))
}

fn utf8_name(entry: &fs::DirEntry) -> Option<String> {
    let name = entry.file_name();
    if let Some(name) = name.to_str() {
        return Some(name.to_string());
    }
    log::debug!("Skipping non UTF-8 name {}", entry.path().display());
    None
}

/// Map "not found" to `None`; every other error is passed through.
fn tolerate_vanished<T>(result: io::Result<T>) -> io::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
