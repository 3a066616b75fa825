//! Retention policy decisions
//!
//! Everything here is pure: a snapshot, the thresholds and an explicit
//! reference time go in, a decision comes out. Nothing touches the
//! filesystem, which is the executor's job.

use crate::models::{DAY_SECONDS, FileEntry, MailboxSnapshot, Timestamp};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Messages strictly larger than this expire on the shorter schedule.
pub const LARGE_MESSAGE_BYTES: u64 = 200_000;

/// Day-based retention limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionThresholds {
    pub delete_mails_after: u32,
    pub delete_large_after: u32,
    pub delete_inactive_users_after: u32,
    pub large_message_size: u64,
}

impl Default for RetentionThresholds {
    fn default() -> Self {
        Self {
            delete_mails_after: 20,
            delete_large_after: 7,
            delete_inactive_users_after: 100,
            large_message_size: LARGE_MESSAGE_BYTES,
        }
    }
}

impl RetentionThresholds {
    /// Absolute cutoff times relative to `now`.
    #[must_use]
    pub fn cutoffs(&self, now: Timestamp) -> Cutoffs {
        Cutoffs {
            inactive: days_before(now, self.delete_inactive_users_after),
            mail: days_before(now, self.delete_mails_after),
            large: days_before(now, self.delete_large_after),
        }
    }
}

fn days_before(now: Timestamp, days: u32) -> Timestamp {
    now.saturating_sub(i64::from(days) * DAY_SECONDS)
}

/// Anything strictly older than a cutoff is expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoffs {
    pub inactive: Timestamp,
    pub mail: Timestamp,
    pub large: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageAction {
    Keep,
    DeleteAged,
    DeleteLargeAged,
}

impl MessageAction {
    #[must_use]
    pub fn is_delete(self) -> bool {
        !matches!(self, MessageAction::Keep)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDecision {
    pub entry: FileEntry,
    pub action: MessageAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxVerdict {
    /// Account inactive past the limit; the whole directory goes.
    PurgeWhole { last_login: Timestamp },
    EvaluateMessages { messages: Vec<MessageDecision> },
}

/// Outcome of the retention policy for one mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDecision {
    mailbox_dir: PathBuf,
    verdict: MailboxVerdict,
}

impl RetentionDecision {
    #[must_use]
    pub fn mailbox_dir(&self) -> &Path {
        &self.mailbox_dir
    }

    #[must_use]
    pub fn verdict(&self) -> &MailboxVerdict {
        &self.verdict
    }

    #[must_use]
    pub fn is_purge(&self) -> bool {
        matches!(self.verdict, MailboxVerdict::PurgeWhole { .. })
    }

    /// True when applying the decision mutates the mailbox.
    #[must_use]
    pub fn changed(&self) -> bool {
        match &self.verdict {
            MailboxVerdict::PurgeWhole { .. } => true,
            MailboxVerdict::EvaluateMessages { messages } => {
                messages.iter().any(|m| m.action.is_delete())
            }
        }
    }

    /// Messages scheduled for removal, in scan order.
    pub fn deletions(&self) -> impl Iterator<Item = &MessageDecision> {
        let messages: &[MessageDecision] = match &self.verdict {
            MailboxVerdict::PurgeWhole { .. } => &[],
            MailboxVerdict::EvaluateMessages { messages } => messages,
        };
        messages.iter().filter(|m| m.action.is_delete())
    }
}

/// Classify a single message against precomputed cutoffs.
#[must_use]
pub fn classify_message(entry: &FileEntry, thresholds: &RetentionThresholds, cutoffs: &Cutoffs) -> MessageAction {
    if entry.mtime() < cutoffs.mail {
        MessageAction::DeleteAged
    } else if entry.size() > thresholds.large_message_size && entry.mtime() < cutoffs.large {
        MessageAction::DeleteLargeAged
    } else {
        MessageAction::Keep
    }
}

/// Decide what happens to one mailbox at reference time `now`.
///
/// A mailbox without a `password` file never counts as inactive. When the
/// account is inactive, messages are not evaluated at all.
#[must_use]
pub fn decide(snapshot: &MailboxSnapshot, thresholds: &RetentionThresholds, now: Timestamp) -> RetentionDecision {
    let cutoffs = thresholds.cutoffs(now);
    let mailbox_dir = snapshot.dir().to_path_buf();

    if let Some(last_login) = snapshot.last_login()
        && last_login < cutoffs.inactive
    {
        return RetentionDecision {
            mailbox_dir,
            verdict: MailboxVerdict::PurgeWhole { last_login },
        };
    }

    let messages = snapshot
        .messages()
        .iter()
        .map(|entry| MessageDecision {
            entry: entry.clone(),
            action: classify_message(entry, thresholds, &cutoffs),
        })
        .collect();

    RetentionDecision {
        mailbox_dir,
        verdict: MailboxVerdict::EvaluateMessages { messages },
    }
}
