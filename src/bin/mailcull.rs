//! Maildir retention CLI (mailcull) - Main binary entry point

use mailcull::cli::args::{Command, ExpireArgs, ReportArgs, parse_args};
use mailcull::cli::output::{format_json, format_text, print_errors};
use mailcull::io::config::read_config;
use mailcull::models::{DAY_SECONDS, ProgressSnapshot, Timestamp};
use mailcull::services::batch::{BatchOptions, ProgressNotifier};
use mailcull::services::execute::ExecMode;
use mailcull::services::format::format_size;
use mailcull::services::report::ReportOptions;
use mailcull::{ExpirePolicy, ScanScope};
use std::process;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    // Initialize logger (controlled by RUST_LOG environment variable)
    // Example: RUST_LOG=debug mailcull expire chatmail.ini /home/vmail/mail/example.org
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_help();
            return;
        }
        "--version" | "-v" => {
            print_version();
            return;
        }
        _ => {}
    }

    let cli_args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let exit_code = match &cli_args.command {
        Command::Expire(expire_args) => handle_expire(expire_args),
        Command::Report(report_args) => handle_report(report_args),
    };

    process::exit(exit_code);
}

/// Wall clock shifted back by `days`.
fn reference_now(days: u32) -> Timestamp {
    chrono::Utc::now().timestamp() - i64::from(days) * DAY_SECONDS
}

fn exit_code_for(err: &mailcull::Error) -> i32 {
    match err {
        mailcull::Error::InvalidInput(_) | mailcull::Error::Config(_) => 2,
        _ => 4,
    }
}

fn batch_options(jobs: usize, quiet: bool, interval_secs: Option<u64>) -> BatchOptions {
    let mut batch = BatchOptions {
        jobs,
        ..BatchOptions::default()
    };
    if let Some(secs) = interval_secs {
        batch.progress_interval = Duration::from_secs(secs);
    }
    if !quiet {
        let notifier: ProgressNotifier = Arc::new(|snapshot: &ProgressSnapshot| {
            #[allow(clippy::cast_precision_loss)]
            let elapsed_secs = snapshot.timestamp_ms as f64 / 1000.0;
            let throughput_suffix = snapshot
                .recent_throughput_bytes_per_sec
                .map(|bps| format!(", ~{}/s", format_size(bps).trim()))
                .unwrap_or_default();
            eprintln!(
                "[{elapsed_secs:6.1}s] {}/{} mailboxes, {} scanned{throughput_suffix}",
                snapshot.processed_mailboxes,
                snapshot.total_mailboxes,
                format_size(snapshot.processed_bytes).trim(),
            );
        });
        batch.progress_notifier = Some(notifier);
    }
    batch
}

fn handle_expire(args: &ExpireArgs) -> i32 {
    let config = match read_config(&args.config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return exit_code_for(&e);
        }
    };

    let mode = if args.remove {
        ExecMode::Destructive
    } else {
        ExecMode::Preview
    };
    let policy = ExpirePolicy {
        thresholds: config.thresholds(),
        now: reference_now(args.days),
        mode,
    };
    let scope = ScanScope {
        mailboxes_dir: args.mailboxes_dir.clone().into(),
        max_count: args.maxnum,
        batch: batch_options(args.jobs, args.quiet, args.progress_interval_secs),
    };

    if !args.quiet {
        eprintln!(
            "Expiring mailboxes of {} in {}{}",
            config.mail_domain,
            args.mailboxes_dir,
            if args.remove { "" } else { " (preview, use --remove to delete)" }
        );
    }

    let summary = match mailcull::run_expire(&scope, &policy, std::io::stderr()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return exit_code_for(&e);
        }
    };

    if !args.quiet {
        let stats = &summary.stats;
        eprintln!(
            "{} mailboxes scanned, {} purged, {} messages removed ({}), {} vanished",
            summary.mailboxes_scanned,
            stats.mailboxes_purged,
            stats.messages_removed,
            format_size(stats.bytes_freed).trim(),
            stats.vanished
        );
        print_errors(&summary.errors);
    }

    0
}

fn handle_report(args: &ReportArgs) -> i32 {
    let options = ReportOptions {
        now: reference_now(args.days),
        min_login_age_days: args.min_login_age,
        mdir: args.mdir,
        test_prefix: args.test_prefix.clone(),
        top_n: args.top,
    };
    let scope = ScanScope {
        mailboxes_dir: args.mailboxes_dir.clone().into(),
        max_count: args.maxnum,
        batch: batch_options(args.jobs, args.quiet, args.progress_interval_secs),
    };

    let run = match mailcull::run_report(&scope, options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return exit_code_for(&e);
        }
    };

    if args.json {
        println!("{}", format_json(&run.report, &run.errors));
        return 0;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = format_text(&run.report, &mut out) {
        eprintln!("Error: failed to write report: {e}");
        return 4;
    }
    if !args.quiet {
        print_errors(&run.errors);
    }

    0
}

fn print_help() {
    println!("Maildir retention CLI (mailcull) - Expire old mail and report mailbox storage");
    println!();
    println!("USAGE:");
    println!("    mailcull expire <CONFIG> <MAILBOXES_DIR> [OPTIONS]");
    println!("    mailcull report <MAILBOXES_DIR> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    expire    Remove aged messages and inactive mailboxes (preview by default)");
    println!("    report    Summarize storage use and login activity");
    println!();
    println!("GLOBAL OPTIONS:");
    println!("    -h, --help                 Show this help message");
    println!("    -v, --version              Show version information");
    println!();
    println!("COMMON OPTIONS:");
    println!("    --days <N>                Assume the current date is N days earlier");
    println!("    --maxnum <N>              Only look at the first N directory entries");
    println!("    --jobs <N>                Scan N mailboxes in parallel (default: 1)");
    println!("    --progress-interval <S>   Emit progress updates every S seconds (default: 2)");
    println!("    --quiet                   Suppress progress and summary output");
    println!();
    println!("EXPIRE OPTIONS:");
    println!("    --remove                  Actually remove expired files and mailboxes");
    println!();
    println!("REPORT OPTIONS:");
    println!("    --min-login-age <N>       Stale histogram: accounts idle at least N days");
    println!("    --mdir <KIND>             Only count cur, new or tmp messages in histograms");
    println!("    --test-prefix <P>         Local-part prefix of test accounts (default: ci-)");
    println!("    --top <N>                 Length of triage listings (default: 10)");
    println!("    --json                    Emit machine-readable output");
    println!();
    println!("EXAMPLES:");
    println!("    mailcull expire /usr/local/lib/chatmaild/chatmail.ini /home/vmail/mail/example.org");
    println!("    mailcull expire chatmail.ini /home/vmail/mail/example.org --remove");
    println!("    mailcull report /home/vmail/mail/example.org --mdir cur --min-login-age 30");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_DATE: &str = env!("GIT_DATE");
    const BUILD_TARGET: &str = env!("BUILD_TARGET");

    println!("mailcull {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");

    #[cfg(debug_assertions)]
    println!("Build: debug");
    #[cfg(not(debug_assertions))]
    println!("Build: release");
}
