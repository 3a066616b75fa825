//! Integration tests for the storage report over real mailbox trees

use crate::fixtures::{NOW, mailbox, standard_mailbox, write_aged};
use mailcull::cli::output::{format_json, format_text};
use mailcull::services::report::ReportOptions;
use mailcull::services::scan::Scanner;
use mailcull::{MailboxSnapshot, MaildirKind, ScanScope};
use std::path::Path;
use tempfile::TempDir;

fn populate(base: &Path) {
    standard_mailbox(base, "alice@x.org", NOW, 2, 0);
    standard_mailbox(base, "bob@x.org", NOW, 45, 60);
    standard_mailbox(base, "ci-123@x.org", NOW, 1, 0);

    let big = mailbox(base, "big@x.org");
    write_aged(&big.join("password"), 10, NOW, 5).unwrap();
    write_aged(&big.join("cur/huge"), 2_500_000, NOW, 12).unwrap();
    write_aged(&big.join(".Archive/new/mid"), 300_000, NOW, 3).unwrap();
    write_aged(&big.join("dovecot.index.cache"), 4_000, NOW, 0).unwrap();

    let never = mailbox(base, "never@x.org");
    write_aged(&never.join("tmp/partial"), 100, NOW, 0).unwrap();
}

#[test]
fn test_report_totals_match_scanned_mailboxes() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    populate(base);

    let run = mailcull::run_report(&ScanScope::new(base), ReportOptions::new(NOW)).unwrap();
    let snapshots = Scanner::new(base).scan().unwrap().snapshots;

    let report = &run.report;
    assert!(run.errors.is_empty());
    assert_eq!(report.mailboxes, 5);
    assert_eq!(
        report.storage.message_bytes,
        snapshots.iter().map(MailboxSnapshot::message_size).sum::<u64>()
    );
    assert_eq!(
        report.storage.extra_bytes,
        snapshots.iter().map(MailboxSnapshot::extra_size).sum::<u64>()
    );
    assert_eq!(report.storage.message_count, 3 * 2 + 2 + 1);

    assert_eq!(report.logins.all, 4);
    assert_eq!(report.logins.service, 1);
    assert_eq!(report.logins.never, 1);
}

#[test]
fn test_report_triage_spans_nested_folders() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());

    let run = mailcull::run_report(&ScanScope::new(temp_dir.path()), ReportOptions::new(NOW)).unwrap();
    let new = run
        .report
        .largest_by_kind
        .iter()
        .find(|listing| listing.kind == MaildirKind::New)
        .unwrap();

    assert_eq!(new.messages[0].mailbox, "big@x.org");
    assert_eq!(new.messages[0].entry.relpath(), ".Archive/new/mid");

    let oldest = &run.report.oldest_by_tier[0].messages;
    let names: Vec<&str> = oldest.iter().map(|m| m.entry.relpath()).collect();
    assert_eq!(names, vec!["cur/huge", ".Archive/new/mid"]);
}

#[test]
fn test_parallel_report_is_identical() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    populate(base);
    for i in 0..30 {
        standard_mailbox(base, &format!("user{i}@x.org"), NOW, i, i * 3);
    }

    let sequential = mailcull::run_report(&ScanScope::new(base), ReportOptions::new(NOW)).unwrap();

    let mut scope = ScanScope::new(base);
    scope.batch.jobs = 4;
    let parallel = mailcull::run_report(&scope, ReportOptions::new(NOW)).unwrap();

    assert_eq!(sequential.report, parallel.report);
}

#[test]
fn test_report_respects_max_count() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());

    let mut scope = ScanScope::new(temp_dir.path());
    scope.max_count = Some(2);
    let run = mailcull::run_report(&scope, ReportOptions::new(NOW)).unwrap();
    assert!(run.report.mailboxes <= 2);
}

#[test]
fn test_text_rendering_has_all_sections() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());

    let mut options = ReportOptions::new(NOW);
    options.min_login_age_days = 30;
    let run = mailcull::run_report(&ScanScope::new(temp_dir.path()), options).unwrap();

    let mut out = Vec::new();
    format_text(&run.report, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("## Mailbox storage use analysis"));
    assert!(text.contains("Mailboxes scanned      : 5"));
    assert!(text.contains("### Message storage by size"));
    assert!(text.contains("### Message storage for 30 days old logins (1 mailboxes)"));
    assert!(text.contains("## Login stats, from date reference 2023-11-14 22:13:20 UTC"));
    assert!(text.contains("test (ci-*)"));
    assert!(text.contains("## Largest messages in cur"));
    assert!(text.contains("## Oldest messages larger than 200K"));
    assert!(text.contains("big@x.org/cur/huge"));
}

#[test]
fn test_text_rendering_marks_mdir_filter() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());

    let mut options = ReportOptions::new(NOW);
    options.mdir = Some(MaildirKind::New);
    let run = mailcull::run_report(&ScanScope::new(temp_dir.path()), options).unwrap();

    let mut out = Vec::new();
    format_text(&run.report, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[new] larger than"));
}

#[test]
fn test_json_rendering() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());

    let run = mailcull::run_report(&ScanScope::new(temp_dir.path()), ReportOptions::new(NOW)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&format_json(&run.report, &run.errors)).unwrap();

    let report = &json["report"];
    assert_eq!(report["mailboxes"], 5);
    assert_eq!(report["reference_time"], NOW);
    assert_eq!(report["test_prefix"], "ci-");
    assert_eq!(report["size_buckets"].as_array().unwrap().len(), 4);
    assert_eq!(report["logins"]["windows"].as_array().unwrap().len(), 7);
    assert_eq!(json["error_count"], 0);
    assert!(json["errors"].is_null());

    let largest_cur = &report["largest_by_kind"][0];
    assert_eq!(largest_cur["kind"], "cur");
    assert_eq!(largest_cur["messages"][0]["mailbox"], "big@x.org");
    assert_eq!(largest_cur["messages"][0]["relpath"], "cur/huge");
}

#[test]
fn test_missing_mailboxes_dir() {
    let temp_dir = TempDir::new().unwrap();
    let scope = ScanScope::new(temp_dir.path().join("nope"));
    assert!(matches!(
        mailcull::run_report(&scope, ReportOptions::new(NOW)),
        Err(mailcull::Error::InvalidInput(_))
    ));
}
