//! Per-mailbox batch execution.
//!
//! Mailboxes are independent: each scan touches only its own subtree, so the
//! cycle can run on a bounded `rayon` pool. With a single job everything runs
//! on the calling thread in listing order.
//!
//! Unreadable mailboxes are skipped and collected as [`ErrorItem`]s; errors
//! returned by the visitor abort the run.

pub mod progress;

use crate::models::{ErrorItem, MailboxSnapshot, ProgressSnapshot};
use crate::services::scan::{scan_mailbox, skipped_mailbox};
use crate::{Error, Result};
use progress::{ProgressCounters, ProgressThrottler};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Snapshots gathered in parallel before being folded in order.
const ORDERED_CHUNK: usize = 256;

pub type ProgressNotifier = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

#[derive(Clone)]
pub struct BatchOptions {
    /// Worker threads; 1 runs sequentially.
    pub jobs: usize,
    pub progress_interval: Duration,
    pub progress_notifier: Option<ProgressNotifier>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            progress_interval: Duration::from_secs(2),
            progress_notifier: None,
        }
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("jobs", &self.jobs)
            .field("progress_interval", &self.progress_interval)
            .field("progress_notifier", &self.progress_notifier.is_some())
            .finish()
    }
}

/// What a finished batch saw
#[derive(Debug, Default)]
pub struct BatchStats {
    pub scanned: u64,
    pub errors: Vec<ErrorItem>,
}

pub struct BatchRunner {
    pool: Option<rayon::ThreadPool>,
    scanned: AtomicU64,
    processed_mailboxes: AtomicU64,
    processed_bytes: AtomicU64,
    total_mailboxes: AtomicU64,
    errors: Mutex<Vec<ErrorItem>>,
    throttler: Mutex<ProgressThrottler>,
    notifier: Option<ProgressNotifier>,
    start_instant: Instant,
}

impl BatchRunner {
    pub fn new(options: &BatchOptions) -> Result<Self> {
        if options.jobs == 0 {
            return Err(Error::InvalidInput("jobs must be at least 1".to_string()));
        }

        let pool = if options.jobs == 1 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.jobs)
                .thread_name(|index| format!("mailcull-{index}"))
                .build()
                .map_err(|err| Error::System(format!("failed to start worker pool: {err}")))?;
            Some(pool)
        };

        Ok(Self {
            pool,
            scanned: AtomicU64::new(0),
            processed_mailboxes: AtomicU64::new(0),
            processed_bytes: AtomicU64::new(0),
            total_mailboxes: AtomicU64::new(0),
            errors: Mutex::new(Vec::new()),
            throttler: Mutex::new(ProgressThrottler::with_interval(options.progress_interval)),
            notifier: options.progress_notifier.clone(),
            start_instant: Instant::now(),
        })
    }

    /// Scan every mailbox and hand each snapshot to `visit`.
    ///
    /// With more than one job the visiting order is unspecified. The first
    /// error returned by `visit` stops the run.
    pub fn for_each_snapshot<F>(&self, dirs: &[PathBuf], visit: F) -> Result<()>
    where
        F: Fn(MailboxSnapshot) -> Result<()> + Send + Sync,
    {
        self.add_total(dirs.len());
        let visit_one = |dir: &PathBuf| match self.scan_one(dir) {
            Some(snapshot) => visit(snapshot),
            None => Ok(()),
        };

        match &self.pool {
            None => dirs.iter().try_for_each(visit_one),
            Some(pool) => pool.install(|| dirs.par_iter().try_for_each(visit_one)),
        }
    }

    /// Scan every mailbox and fold the snapshots in listing order.
    pub fn fold_snapshots<F>(&self, dirs: &[PathBuf], mut visit: F)
    where
        F: FnMut(&MailboxSnapshot),
    {
        self.add_total(dirs.len());
        let Some(pool) = &self.pool else {
            for dir in dirs {
                if let Some(snapshot) = self.scan_one(dir) {
                    visit(&snapshot);
                }
            }
            return;
        };

        for chunk in dirs.chunks(ORDERED_CHUNK) {
            let snapshots: Vec<Option<MailboxSnapshot>> =
                pool.install(|| chunk.par_iter().map(|dir| self.scan_one(dir)).collect());
            for snapshot in snapshots.into_iter().flatten() {
                visit(&snapshot);
            }
        }
    }

    fn scan_one(&self, dir: &Path) -> Option<MailboxSnapshot> {
        match scan_mailbox(dir) {
            Ok(snapshot) => {
                self.scanned.fetch_add(1, Ordering::Relaxed);
                self.register_progress(snapshot.total_size());
                Some(snapshot)
            }
            Err(err) => {
                if let Some(item) = skipped_mailbox(dir, &err) {
                    self.errors
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(item);
                }
                self.register_progress(0);
                None
            }
        }
    }

    fn add_total(&self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.total_mailboxes.fetch_add(count, Ordering::Relaxed);
    }

    fn register_progress(&self, size_bytes: u64) {
        self.processed_mailboxes.fetch_add(1, Ordering::Relaxed);
        self.processed_bytes.fetch_add(size_bytes, Ordering::Relaxed);
        if self.notifier.is_none() {
            return;
        }

        let now = Instant::now();
        let counters = self.counters(now);
        let snapshot = self
            .throttler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .consider(now, counters);
        if let Some(snapshot) = snapshot
            && let Some(notifier) = &self.notifier
        {
            notifier(&snapshot);
        }
    }

    fn counters(&self, now: Instant) -> ProgressCounters {
        let millis = now
            .checked_duration_since(self.start_instant)
            .unwrap_or_default()
            .as_millis();
        ProgressCounters {
            processed_mailboxes: self.processed_mailboxes.load(Ordering::Relaxed),
            processed_bytes: self.processed_bytes.load(Ordering::Relaxed),
            total_mailboxes: self.total_mailboxes.load(Ordering::Relaxed),
            timestamp_ms: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }

    /// Emit final progress and hand back the collected counters.
    #[must_use]
    pub fn finish(self) -> BatchStats {
        if let Some(notifier) = &self.notifier {
            let now = Instant::now();
            let counters = self.counters(now);
            let snapshot = self
                .throttler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .force_emit(now, counters);
            notifier(&snapshot);
        }

        BatchStats {
            scanned: self.scanned.load(Ordering::Relaxed),
            errors: self
                .errors
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}
