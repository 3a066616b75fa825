//! Data models for scanned mailboxes, message files, and errors

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

pub const DAY_SECONDS: i64 = 86_400;

/// Extra file whose mtime records the last successful login.
pub const PASSWORD_FILE: &str = "password";

/// The three leaf directories of a maildir folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaildirKind {
    Cur,
    New,
    Tmp,
}

impl MaildirKind {
    pub const ALL: [MaildirKind; 3] = [MaildirKind::Cur, MaildirKind::New, MaildirKind::Tmp];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MaildirKind::Cur => "cur",
            MaildirKind::New => "new",
            MaildirKind::Tmp => "tmp",
        }
    }

    /// Recognize a leaf directory by its exact name.
    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "cur" => Some(MaildirKind::Cur),
            "new" => Some(MaildirKind::New),
            "tmp" => Some(MaildirKind::Tmp),
            _ => None,
        }
    }
}

impl std::fmt::Display for MaildirKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MaildirKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaildirKind::from_dir_name(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown maildir kind '{s}' (expected cur, new or tmp)"))
    }
}

/// A file found inside a mailbox, relative to the mailbox directory.
///
/// Values are immutable once scanned. Ordering is by size, then mtime, then
/// relative path, so equal entries always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    relpath: String,
    mtime: Timestamp,
    size: u64,
}

impl FileEntry {
    #[must_use]
    pub fn new(relpath: impl Into<String>, mtime: Timestamp, size: u64) -> Self {
        Self {
            relpath: relpath.into(),
            mtime,
            size,
        }
    }

    #[must_use]
    pub fn relpath(&self) -> &str {
        &self.relpath
    }

    #[must_use]
    pub fn mtime(&self) -> Timestamp {
        self.mtime
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Leaf kind of a message entry (`.../cur/<name>` -> `Cur`).
    ///
    /// Returns `None` for extra files, which live at the mailbox top level.
    #[must_use]
    pub fn kind(&self) -> Option<MaildirKind> {
        let mut parts = self.relpath.rsplit('/');
        parts.next()?;
        parts.next().and_then(MaildirKind::from_dir_name)
    }

    /// Subfolder holding a nested message (`Sent/cur/x` -> `Sent`).
    #[must_use]
    pub fn folder(&self) -> Option<&str> {
        let (dir, _name) = self.relpath.rsplit_once('/')?;
        let (folder, _kind) = dir.rsplit_once('/')?;
        Some(folder)
    }
}

impl PartialOrd for FileEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.size
            .cmp(&other.size)
            .then(self.mtime.cmp(&other.mtime))
            .then_with(|| self.relpath.cmp(&other.relpath))
    }
}

/// Point-in-time view of one mailbox directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxSnapshot {
    dir: PathBuf,
    messages: Vec<FileEntry>,
    extra_files: Vec<FileEntry>,
}

impl MailboxSnapshot {
    /// Build a snapshot; extra files are kept largest first.
    #[must_use]
    pub fn new(dir: PathBuf, messages: Vec<FileEntry>, mut extra_files: Vec<FileEntry>) -> Self {
        extra_files.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.relpath.cmp(&b.relpath)));
        Self {
            dir,
            messages,
            extra_files,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Mailbox directory name, which is the account address.
    #[must_use]
    pub fn address(&self) -> String {
        self.dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Part of the address before `@`.
    #[must_use]
    pub fn local_part(&self) -> String {
        let address = self.address();
        match address.split_once('@') {
            Some((local, _domain)) => local.to_string(),
            None => address,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[FileEntry] {
        &self.messages
    }

    /// Messages stored under one leaf kind, at any folder depth.
    #[must_use]
    pub fn messages_of(&self, kind: MaildirKind) -> Vec<&FileEntry> {
        self.messages
            .iter()
            .filter(|m| m.kind() == Some(kind))
            .collect()
    }

    #[must_use]
    pub fn extra_files(&self) -> &[FileEntry] {
        &self.extra_files
    }

    /// Mtime of the `password` file, if the account ever logged in.
    #[must_use]
    pub fn last_login(&self) -> Option<Timestamp> {
        self.extra_files
            .iter()
            .find(|entry| entry.relpath == PASSWORD_FILE)
            .map(FileEntry::mtime)
    }

    #[must_use]
    pub fn message_size(&self) -> u64 {
        self.messages.iter().map(FileEntry::size).sum()
    }

    #[must_use]
    pub fn extra_size(&self) -> u64 {
        self.extra_files.iter().map(FileEntry::size).sum()
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.message_size() + self.extra_size()
    }
}

/// Represents an error encountered while scanning a mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl ErrorItem {
    #[must_use]
    pub fn from_io(path: &Path, error: &std::io::Error) -> Self {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => "ENOENT",
            std::io::ErrorKind::PermissionDenied => "EACCES",
            _ => "IO",
        };
        Self {
            path: path.to_string_lossy().into_owned(),
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Progress counters emitted periodically during a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub timestamp_ms: u64,
    pub processed_mailboxes: u64,
    pub processed_bytes: u64,
    pub total_mailboxes: u64,
    pub recent_throughput_bytes_per_sec: Option<u64>,
}
