//! Storage and login-activity statistics over scanned mailboxes
//!
//! [`ReportAccumulator`] folds snapshots one at a time and never holds on to
//! them. Only the bounded triage listings keep copies of individual entries.

use crate::models::{DAY_SECONDS, FileEntry, MailboxSnapshot, MaildirKind, Timestamp};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Minimum message sizes for the size histograms.
pub const SIZE_THRESHOLDS: [u64; 4] = [0, 160_000, 500_000, 2_000_000];

/// Day windows for login recency.
pub const LOGIN_WINDOWS_DAYS: [u32; 7] = [1, 10, 30, 40, 80, 100, 150];

/// Size tiers for the "oldest large messages" listings.
pub const TRIAGE_SIZE_TIERS: [u64; 3] = [200_000, 1_000_000, 10_000_000];

/// Options controlling what the report aggregates
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Reference time for every age computation.
    pub now: Timestamp,
    /// Stale histogram only counts accounts idle at least this many days.
    pub min_login_age_days: u32,
    /// Restrict size histograms to one leaf kind.
    pub mdir: Option<MaildirKind>,
    /// Local-part prefix of service/test accounts.
    pub test_prefix: String,
    /// Length of each triage listing.
    pub top_n: usize,
}

impl ReportOptions {
    #[must_use]
    pub fn new(now: Timestamp) -> Self {
        Self {
            now,
            min_login_age_days: 0,
            mdir: None,
            test_prefix: "ci-".to_string(),
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageTotals {
    pub message_bytes: u64,
    pub message_count: u64,
    pub extra_bytes: u64,
    pub extra_count: u64,
}

impl StorageTotals {
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.message_bytes + self.extra_bytes
    }
}

/// Messages at or above `min_size`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeBucket {
    pub min_size: u64,
    pub messages: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginWindow {
    pub days: u32,
    pub active: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginStats {
    /// Mailboxes with a `password` file.
    pub all: u64,
    pub service: u64,
    pub non_service: u64,
    /// Mailboxes with no `password` file.
    pub never: u64,
    pub windows: Vec<LoginWindow>,
}

/// A message singled out for operator attention
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TriageEntry {
    pub mailbox: String,
    #[serde(flatten)]
    pub entry: FileEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindListing {
    pub kind: MaildirKind,
    pub messages: Vec<TriageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierListing {
    pub min_size: u64,
    pub messages: Vec<TriageEntry>,
}

/// Final, immutable report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub reference_time: Timestamp,
    pub min_login_age_days: u32,
    pub mdir: Option<MaildirKind>,
    pub test_prefix: String,
    pub mailboxes: u64,
    pub storage: StorageTotals,
    pub size_buckets: Vec<SizeBucket>,
    pub stale_mailboxes: u64,
    pub stale_size_buckets: Vec<SizeBucket>,
    pub logins: LoginStats,
    pub largest_by_kind: Vec<KindListing>,
    pub oldest_by_tier: Vec<TierListing>,
}

/// Keeps the `limit` entries with the greatest keys.
#[derive(Debug)]
struct TopN<K: Ord> {
    limit: usize,
    heap: BinaryHeap<Reverse<(K, TriageEntry)>>,
}

impl<K: Ord> TopN<K> {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit + 1),
        }
    }

    /// Insert unless the candidate would be evicted straight away.
    /// `make` only runs for entries that are kept.
    fn offer(&mut self, key: K, make: impl FnOnce() -> TriageEntry) {
        if self.limit == 0 {
            return;
        }
        if self.heap.len() >= self.limit
            && let Some(Reverse((lowest, _))) = self.heap.peek()
            && key <= *lowest
        {
            return;
        }
        self.heap.push(Reverse((key, make())));
        if self.heap.len() > self.limit {
            self.heap.pop();
        }
    }

    /// Greatest key first.
    fn into_sorted(self) -> Vec<TriageEntry> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse((_, entry))| entry)
            .collect()
    }
}

/// Largest first, older first among equal sizes.
type LargestKey = (u64, Reverse<Timestamp>);
/// Oldest first, larger first among equal mtimes.
type OldestKey = (Reverse<Timestamp>, u64);

/// Single-pass accumulator over mailbox snapshots
#[derive(Debug)]
pub struct ReportAccumulator {
    options: ReportOptions,
    mailboxes: u64,
    storage: StorageTotals,
    size_buckets: Vec<SizeBucket>,
    stale_mailboxes: u64,
    stale_size_buckets: Vec<SizeBucket>,
    logins: LoginStats,
    largest: Vec<(MaildirKind, TopN<LargestKey>)>,
    oldest: Vec<(u64, TopN<OldestKey>)>,
}

fn empty_buckets() -> Vec<SizeBucket> {
    SIZE_THRESHOLDS
        .iter()
        .map(|&min_size| SizeBucket {
            min_size,
            messages: 0,
            bytes: 0,
        })
        .collect()
}

fn add_to_buckets(buckets: &mut [SizeBucket], message: &FileEntry) {
    for bucket in buckets.iter_mut().filter(|b| message.size() >= b.min_size) {
        bucket.messages += 1;
        bucket.bytes += message.size();
    }
}

impl ReportAccumulator {
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        let top_n = options.top_n;
        Self {
            options,
            mailboxes: 0,
            storage: StorageTotals::default(),
            size_buckets: empty_buckets(),
            stale_mailboxes: 0,
            stale_size_buckets: empty_buckets(),
            logins: LoginStats {
                windows: LOGIN_WINDOWS_DAYS
                    .iter()
                    .map(|&days| LoginWindow { days, active: 0 })
                    .collect(),
                ..LoginStats::default()
            },
            largest: MaildirKind::ALL
                .iter()
                .map(|&kind| (kind, TopN::new(top_n)))
                .collect(),
            oldest: TRIAGE_SIZE_TIERS
                .iter()
                .map(|&tier| (tier, TopN::new(top_n)))
                .collect(),
        }
    }

    /// Whether the mailbox belongs to an automated service/test account.
    #[must_use]
    pub fn is_service_account(&self, snapshot: &MailboxSnapshot) -> bool {
        !self.options.test_prefix.is_empty()
            && snapshot.local_part().starts_with(&self.options.test_prefix)
    }

    pub fn accumulate(&mut self, snapshot: &MailboxSnapshot) {
        let now = self.options.now;
        self.mailboxes += 1;

        let last_login = snapshot.last_login();
        match last_login {
            Some(login) => {
                self.logins.all += 1;
                if self.is_service_account(snapshot) {
                    self.logins.service += 1;
                } else {
                    self.logins.non_service += 1;
                    for window in &mut self.logins.windows {
                        if login >= now - i64::from(window.days) * DAY_SECONDS {
                            window.active += 1;
                        }
                    }
                }
            }
            None => self.logins.never += 1,
        }

        let stale_cutoff = now - i64::from(self.options.min_login_age_days) * DAY_SECONDS;
        let stale = last_login.is_some_and(|login| login <= stale_cutoff);
        if stale {
            self.stale_mailboxes += 1;
        }

        let mailbox = snapshot.address();
        for message in snapshot.messages() {
            self.storage.message_bytes += message.size();
            self.storage.message_count += 1;

            let kind = message.kind();
            if self.options.mdir.is_none() || kind == self.options.mdir {
                add_to_buckets(&mut self.size_buckets, message);
                if stale {
                    add_to_buckets(&mut self.stale_size_buckets, message);
                }
            }

            if let Some(kind) = kind
                && let Some((_, top)) = self.largest.iter_mut().find(|(k, _)| *k == kind)
            {
                top.offer((message.size(), Reverse(message.mtime())), || {
                    triage(&mailbox, message)
                });
            }
            for (tier, top) in &mut self.oldest {
                if message.size() > *tier {
                    top.offer((Reverse(message.mtime()), message.size()), || {
                        triage(&mailbox, message)
                    });
                }
            }
        }

        for extra in snapshot.extra_files() {
            self.storage.extra_bytes += extra.size();
            self.storage.extra_count += 1;
        }
    }

    #[must_use]
    pub fn finish(self) -> Report {
        Report {
            reference_time: self.options.now,
            min_login_age_days: self.options.min_login_age_days,
            mdir: self.options.mdir,
            test_prefix: self.options.test_prefix,
            mailboxes: self.mailboxes,
            storage: self.storage,
            size_buckets: self.size_buckets,
            stale_mailboxes: self.stale_mailboxes,
            stale_size_buckets: self.stale_size_buckets,
            logins: self.logins,
            largest_by_kind: self
                .largest
                .into_iter()
                .map(|(kind, top)| KindListing {
                    kind,
                    messages: top.into_sorted(),
                })
                .collect(),
            oldest_by_tier: self
                .oldest
                .into_iter()
                .map(|(min_size, top)| TierListing {
                    min_size,
                    messages: top.into_sorted(),
                })
                .collect(),
        }
    }
}

fn triage(mailbox: &str, message: &FileEntry) -> TriageEntry {
    TriageEntry {
        mailbox: mailbox.to_string(),
        entry: message.clone(),
    }
}
