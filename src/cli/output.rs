//! Output formatting for CLI

use crate::ErrorItem;
use crate::services::format::{format_age_days, format_kilo, format_mega, format_size, percent};
use crate::services::report::{Report, SizeBucket};
use chrono::DateTime;
use std::io::{self, Write};

/// Render the report as sectioned plain text.
pub fn format_text<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    write_storage(report, out)?;
    write_size_buckets(report, out)?;
    write_logins(report, out)?;
    write_triage(report, out)?;
    Ok(())
}

fn write_storage<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    let storage = &report.storage;
    let total = storage.total_bytes();
    writeln!(out)?;
    writeln!(out, "## Mailbox storage use analysis")?;
    writeln!(out, "Mailboxes scanned      : {}", report.mailboxes)?;
    writeln!(out, "Mailbox data total size: {}", format_mega(total))?;
    writeln!(
        out,
        "Messages total size    : {} ({:.2}%, {} files)",
        format_mega(storage.message_bytes),
        percent(storage.message_bytes, total),
        storage.message_count
    )?;
    writeln!(
        out,
        "Extra files            : {} ({:.2}%, {} files)",
        format_mega(storage.extra_bytes),
        percent(storage.extra_bytes, total),
        storage.extra_count
    )
}

fn write_size_buckets<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    let prefix = report
        .mdir
        .map(|kind| format!("[{kind}] "))
        .unwrap_or_default();
    let all_messages = report.storage.message_bytes;

    writeln!(out)?;
    writeln!(out, "### Message storage by size")?;
    write_buckets(&report.size_buckets, &prefix, all_messages, out)?;

    writeln!(out)?;
    writeln!(
        out,
        "### Message storage for {} days old logins ({} mailboxes)",
        report.min_login_age_days, report.stale_mailboxes
    )?;
    write_buckets(&report.stale_size_buckets, &prefix, all_messages, out)
}

fn write_buckets<W: Write>(buckets: &[SizeBucket], prefix: &str, all_messages: u64, out: &mut W) -> io::Result<()> {
    for bucket in buckets {
        writeln!(
            out,
            "{prefix}larger than {}: {} ({:.2}%) in {} messages",
            format_kilo(bucket.min_size),
            format_mega(bucket.bytes),
            percent(bucket.bytes, all_messages),
            bucket.messages
        )?;
    }
    Ok(())
}

fn write_logins<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    let logins = &report.logins;
    let reference = DateTime::from_timestamp(report.reference_time, 0)
        .map_or_else(|| report.reference_time.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    writeln!(out)?;
    writeln!(out, "## Login stats, from date reference {reference}")?;
    writeln!(out, "all:          {}", format_kilo(logins.all))?;
    writeln!(out, "non-test:     {}", format_kilo(logins.non_service))?;
    writeln!(out, "test ({}*): {}", report.test_prefix, format_kilo(logins.service))?;
    writeln!(out, "never:        {}", format_kilo(logins.never))?;
    for window in &logins.windows {
        writeln!(
            out,
            "last {:3} days: {} ({:2.2}%)",
            window.days,
            format_kilo(window.active),
            percent(window.active, logins.non_service)
        )?;
    }
    Ok(())
}

fn write_triage<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    let now = report.reference_time;

    for listing in &report.largest_by_kind {
        writeln!(out)?;
        writeln!(out, "## Largest messages in {}", listing.kind)?;
        for message in &listing.messages {
            writeln!(
                out,
                "{} {} {}/{}",
                format_size(message.entry.size()),
                format_age_days(now, message.entry.mtime()),
                message.mailbox,
                message.entry.relpath()
            )?;
        }
    }

    for listing in &report.oldest_by_tier {
        writeln!(out)?;
        writeln!(out, "## Oldest messages larger than {}", format_size(listing.min_size).trim())?;
        for message in &listing.messages {
            writeln!(
                out,
                "{} {} {}/{}",
                format_age_days(now, message.entry.mtime()),
                format_size(message.entry.size()),
                message.mailbox,
                message.entry.relpath()
            )?;
        }
    }
    Ok(())
}

/// Format the report as JSON
#[must_use]
pub fn format_json(report: &Report, errors: &[ErrorItem]) -> String {
    let output = serde_json::json!({
        "report": report,
        "error_count": errors.len(),
        "errors": if errors.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::json!(errors)
        }
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Print skipped mailboxes to stderr, at most five of them.
pub fn print_errors(errors: &[ErrorItem]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("Mailboxes skipped: {}", errors.len());
    for error in errors.iter().take(5) {
        eprintln!("  {}: {}", error.path, error.message);
    }
    if errors.len() > 5 {
        eprintln!("  ... and {} more", errors.len() - 5);
    }
}
