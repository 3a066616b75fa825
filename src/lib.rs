//! Maildir Retention and Storage Reporting Library
//!
//! This library scans a directory of maildir mailboxes, expires messages and
//! inactive accounts according to a retention policy, and aggregates storage
//! and login-activity statistics for capacity planning.
//!
//! Both workflows share the same read-only [`MailboxSnapshot`] model:
//!
//! - expiry: scan -> [`services::retention::decide`] -> [`services::execute::Executor`]
//! - reporting: scan -> [`services::report::ReportAccumulator`] -> render

pub mod cli;
pub mod io;
pub mod models;
pub mod services;

pub use models::{ErrorItem, FileEntry, MailboxSnapshot, MaildirKind, Timestamp};

use services::batch::{BatchOptions, BatchRunner};
use services::execute::{ExecMode, Executor, ExpiryStats};
use services::report::{Report, ReportAccumulator, ReportOptions};
use services::retention::{RetentionThresholds, decide};
use services::scan::Scanner;
use std::io::Write;
use std::path::PathBuf;
use std::result;

/// Custom error type for the library
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    InvalidInput(String),
    Config(String),
    System(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::Config(msg) => write!(f, "Config error: {msg}"),
            Error::System(msg) => write!(f, "System error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Which mailboxes a run covers and how it is executed
#[derive(Debug, Clone)]
pub struct ScanScope {
    pub mailboxes_dir: PathBuf,
    pub max_count: Option<usize>,
    pub batch: BatchOptions,
}

impl ScanScope {
    #[must_use]
    pub fn new(mailboxes_dir: impl Into<PathBuf>) -> Self {
        Self {
            mailboxes_dir: mailboxes_dir.into(),
            max_count: None,
            batch: BatchOptions::default(),
        }
    }
}

/// Retention policy applied by an expiry run
#[derive(Debug, Clone, Copy)]
pub struct ExpirePolicy {
    pub thresholds: RetentionThresholds,
    pub now: Timestamp,
    pub mode: ExecMode,
}

/// Summary result from an expiry run
#[derive(Debug)]
pub struct ExpireSummary {
    pub mailboxes_scanned: u64,
    pub stats: ExpiryStats,
    pub errors: Vec<ErrorItem>,
}

/// Summary result from a report run
#[derive(Debug)]
pub struct ReportRun {
    pub report: Report,
    pub errors: Vec<ErrorItem>,
}

/// Scan, decide and apply the retention policy to every mailbox.
///
/// Operator records (`removing ...`) are written to `out`. A hard I/O error
/// while deleting stops the run; removals already made stay in effect.
pub fn run_expire<W: Write + Send>(scope: &ScanScope, policy: &ExpirePolicy, out: W) -> Result<ExpireSummary> {
    let dirs = Scanner::new(&scope.mailboxes_dir)
        .with_max_count(scope.max_count)
        .mailbox_dirs()?;
    log::info!(
        "Expiring {} mailboxes in {} ({:?})",
        dirs.len(),
        scope.mailboxes_dir.display(),
        policy.mode
    );

    let runner = BatchRunner::new(&scope.batch)?;
    let executor = Executor::new(policy.mode, policy.now, out);
    runner.for_each_snapshot(&dirs, |snapshot| {
        let decision = decide(&snapshot, &policy.thresholds, policy.now);
        executor.apply(&decision)
    })?;

    let batch = runner.finish();
    let stats = executor.stats();
    log::info!(
        "Expiry done: {} mailboxes scanned, {} purged, {} messages removed ({} bytes), {} vanished, {} skipped",
        batch.scanned,
        stats.mailboxes_purged,
        stats.messages_removed,
        stats.bytes_freed,
        stats.vanished,
        batch.errors.len()
    );

    Ok(ExpireSummary {
        mailboxes_scanned: batch.scanned,
        stats,
        errors: batch.errors,
    })
}

/// Scan every mailbox and aggregate the storage report.
pub fn run_report(scope: &ScanScope, options: ReportOptions) -> Result<ReportRun> {
    let dirs = Scanner::new(&scope.mailboxes_dir)
        .with_max_count(scope.max_count)
        .mailbox_dirs()?;
    log::info!(
        "Reporting on {} mailboxes in {}",
        dirs.len(),
        scope.mailboxes_dir.display()
    );

    let runner = BatchRunner::new(&scope.batch)?;
    let mut accumulator = ReportAccumulator::new(options);
    runner.fold_snapshots(&dirs, |snapshot| accumulator.accumulate(snapshot));
    let batch = runner.finish();

    Ok(ReportRun {
        report: accumulator.finish(),
        errors: batch.errors,
    })
}
