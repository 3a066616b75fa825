//! Unit tests for retention decisions

use crate::fixtures::{DAY, NOW};
use mailcull::services::retention::{
    MailboxVerdict, MessageAction, RetentionThresholds, classify_message, decide,
};
use mailcull::{FileEntry, MailboxSnapshot};
use std::path::PathBuf;

fn snapshot(messages: Vec<FileEntry>, password_age_days: Option<i64>) -> MailboxSnapshot {
    let extra = password_age_days
        .map(|age| vec![FileEntry::new("password", NOW - age * DAY, 20)])
        .unwrap_or_default();
    MailboxSnapshot::new(PathBuf::from("/mail/user@example.org"), messages, extra)
}

fn aged(relpath: &str, size: u64, age_days: i64) -> FileEntry {
    FileEntry::new(relpath, NOW - age_days * DAY, size)
}

fn actions(snapshot: &MailboxSnapshot) -> Vec<MessageAction> {
    let decision = decide(snapshot, &RetentionThresholds::default(), NOW);
    match decision.verdict() {
        MailboxVerdict::EvaluateMessages { messages } => messages.iter().map(|m| m.action).collect(),
        MailboxVerdict::PurgeWhole { .. } => panic!("unexpected purge"),
    }
}

#[test]
fn default_thresholds_match_deployment_defaults() {
    let t = RetentionThresholds::default();
    assert_eq!(t.delete_mails_after, 20);
    assert_eq!(t.delete_large_after, 7);
    assert_eq!(t.delete_inactive_users_after, 100);
    assert_eq!(t.large_message_size, 200_000);
}

#[test]
fn recent_mailbox_keeps_everything() {
    let snap = snapshot(vec![aged("cur/msg1", 500, 1), aged("new/msg2", 600, 1)], Some(1));
    let decision = decide(&snap, &RetentionThresholds::default(), NOW);

    assert!(!decision.changed());
    assert_eq!(decision.deletions().count(), 0);
    assert_eq!(actions(&snap), vec![MessageAction::Keep, MessageAction::Keep]);
}

#[test]
fn aged_message_is_deleted_and_marks_mailbox_changed() {
    let snap = snapshot(vec![aged("cur/msg1", 500, 21), aged("new/msg2", 600, 1)], Some(1));
    let decision = decide(&snap, &RetentionThresholds::default(), NOW);

    assert!(decision.changed());
    let deleted: Vec<&str> = decision.deletions().map(|m| m.entry.relpath()).collect();
    assert_eq!(deleted, vec!["cur/msg1"]);
    assert_eq!(actions(&snap)[0], MessageAction::DeleteAged);
}

#[test]
fn inactive_account_is_purged_whole() {
    let snap = snapshot(vec![aged("cur/msg1", 500, 1), aged("cur/old", 500, 50)], Some(101));
    let decision = decide(&snap, &RetentionThresholds::default(), NOW);

    assert!(decision.is_purge());
    assert!(decision.changed());
    assert_eq!(
        decision.verdict(),
        &MailboxVerdict::PurgeWhole {
            last_login: NOW - 101 * DAY
        }
    );
    // Purge supersedes per-message evaluation.
    assert_eq!(decision.deletions().count(), 0);
}

#[test]
fn large_message_expires_on_short_schedule() {
    let snap = snapshot(
        vec![aged("cur/big-old", 300_000, 8), aged("cur/big-new", 300_000, 1)],
        Some(1),
    );
    assert_eq!(
        actions(&snap),
        vec![MessageAction::DeleteLargeAged, MessageAction::Keep]
    );
}

#[test]
fn large_threshold_is_strictly_greater_than() {
    let snap = snapshot(
        vec![aged("cur/exact", 200_000, 8), aged("cur/over", 200_001, 8)],
        Some(1),
    );
    assert_eq!(
        actions(&snap),
        vec![MessageAction::Keep, MessageAction::DeleteLargeAged]
    );
}

#[test]
fn aged_takes_precedence_over_large() {
    let snap = snapshot(vec![aged("cur/huge", 5_000_000, 30)], Some(1));
    assert_eq!(actions(&snap), vec![MessageAction::DeleteAged]);
}

#[test]
fn mtime_exactly_at_cutoff_is_kept() {
    let t = RetentionThresholds::default();
    let cutoffs = t.cutoffs(NOW);
    let at_cutoff = FileEntry::new("cur/a", cutoffs.mail, 10);
    let before_cutoff = FileEntry::new("cur/b", cutoffs.mail - 1, 10);

    assert_eq!(classify_message(&at_cutoff, &t, &cutoffs), MessageAction::Keep);
    assert_eq!(
        classify_message(&before_cutoff, &t, &cutoffs),
        MessageAction::DeleteAged
    );
}

#[test]
fn login_exactly_at_inactive_cutoff_is_not_purged() {
    let snap = snapshot(vec![], Some(100));
    let decision = decide(&snap, &RetentionThresholds::default(), NOW);
    assert!(!decision.is_purge());
}

#[test]
fn mailbox_without_password_is_never_purged() {
    let snap = snapshot(vec![aged("cur/ancient", 10, 5000), aged("new/fresh", 10, 0)], None);
    let decision = decide(&snap, &RetentionThresholds::default(), NOW);

    assert!(!decision.is_purge());
    assert_eq!(
        actions(&snap),
        vec![MessageAction::DeleteAged, MessageAction::Keep]
    );
}

#[test]
fn deletion_rule_holds_across_ages_and_sizes() {
    let thresholds = RetentionThresholds {
        delete_mails_after: 15,
        delete_large_after: 4,
        delete_inactive_users_after: 60,
        large_message_size: 200_000,
    };
    let cutoff_mail = NOW - 15 * DAY;
    let cutoff_large = NOW - 4 * DAY;

    let mut messages = Vec::new();
    for age_hours in (0..24 * 20).step_by(7) {
        for size in [0, 1_000, 199_999, 200_000, 200_001, 3_000_000] {
            messages.push(FileEntry::new(
                format!("cur/{age_hours}-{size}"),
                NOW - age_hours * 3600,
                size,
            ));
        }
    }
    let snap = MailboxSnapshot::new(PathBuf::from("/m/a@b"), messages, vec![]);
    let decision = decide(&snap, &thresholds, NOW);

    let MailboxVerdict::EvaluateMessages { messages } = decision.verdict() else {
        panic!("mailbox without password must not be purged");
    };
    for m in messages {
        let expected = m.entry.mtime() < cutoff_mail
            || (m.entry.size() > 200_000 && m.entry.mtime() < cutoff_large);
        assert_eq!(m.action.is_delete(), expected, "{:?}", m.entry);
    }
}

#[test]
fn decision_ignores_extra_files() {
    let snap = MailboxSnapshot::new(
        PathBuf::from("/m/a@b"),
        vec![],
        vec![
            FileEntry::new("password", NOW, 10),
            FileEntry::new("dovecot.index", NOW - 400 * DAY, 5_000_000),
        ],
    );
    let decision = decide(&snap, &RetentionThresholds::default(), NOW);
    assert!(!decision.changed());
}
