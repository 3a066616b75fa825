//! CLI argument parsing

use crate::models::MaildirKind;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Expire(ExpireArgs),
    Report(ReportArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpireArgs {
    pub config_path: String,
    pub mailboxes_dir: String,
    pub days: u32,
    pub maxnum: Option<usize>,
    pub remove: bool,
    pub jobs: usize,
    pub quiet: bool,
    pub progress_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArgs {
    pub mailboxes_dir: String,
    pub days: u32,
    pub min_login_age: u32,
    pub mdir: Option<MaildirKind>,
    pub maxnum: Option<usize>,
    pub test_prefix: String,
    pub top: usize,
    pub json: bool,
    pub jobs: usize,
    pub quiet: bool,
    pub progress_interval_secs: Option<u64>,
}

impl Default for ExpireArgs {
    fn default() -> Self {
        Self {
            config_path: String::new(),
            mailboxes_dir: String::new(),
            days: 0,
            maxnum: None,
            remove: false,
            jobs: 1,
            quiet: false,
            progress_interval_secs: None,
        }
    }
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            mailboxes_dir: String::new(),
            days: 0,
            min_login_age: 0,
            mdir: None,
            maxnum: None,
            test_prefix: "ci-".to_string(),
            top: 10,
            json: false,
            jobs: 1,
            quiet: false,
            progress_interval_secs: None,
        }
    }
}

/// Parse command line arguments
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    let command = match args[1].as_str() {
        "expire" => Command::Expire(parse_expire_args(&args[2..])?),
        "report" => Command::Report(parse_report_args(&args[2..])?),
        _ => return Err(format!("Unknown command: {}", args[1])),
    };

    Ok(CliArgs { command })
}

/// Fetch the value following `args[*i]`, advancing the cursor.
fn take_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{flag} must be a non-negative number, got '{value}'"))
}

fn parse_jobs(value: &str) -> Result<usize, String> {
    let jobs: usize = parse_number("--jobs", value)?;
    if jobs == 0 {
        return Err("--jobs must be at least 1".to_string());
    }
    Ok(jobs)
}

fn parse_interval(value: &str) -> Result<u64, String> {
    let secs: u64 = value
        .parse()
        .map_err(|_| "--progress-interval must be a positive integer".to_string())?;
    if secs == 0 {
        return Err("--progress-interval must be greater than zero".to_string());
    }
    Ok(secs)
}

fn parse_expire_args(args: &[String]) -> Result<ExpireArgs, String> {
    let mut expire = ExpireArgs::default();
    let mut positional = Vec::new();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--days" => expire.days = parse_number("--days", take_value(args, &mut i)?)?,
            "--maxnum" => {
                expire.maxnum = Some(parse_number("--maxnum", take_value(args, &mut i)?)?);
            }
            "--remove" => expire.remove = true,
            "--jobs" => expire.jobs = parse_jobs(take_value(args, &mut i)?)?,
            "--quiet" => expire.quiet = true,
            "--progress-interval" => {
                expire.progress_interval_secs = Some(parse_interval(take_value(args, &mut i)?)?);
            }
            arg if !arg.starts_with("--") => positional.push(arg.to_string()),
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    expire.config_path = positional
        .next()
        .ok_or("Missing required argument: CONFIG_PATH")?;
    expire.mailboxes_dir = positional
        .next()
        .ok_or("Missing required argument: MAILBOXES_DIR")?;
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }

    Ok(expire)
}

fn parse_report_args(args: &[String]) -> Result<ReportArgs, String> {
    let mut report = ReportArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--days" => report.days = parse_number("--days", take_value(args, &mut i)?)?,
            "--min-login-age" => {
                report.min_login_age = parse_number("--min-login-age", take_value(args, &mut i)?)?;
            }
            "--mdir" => report.mdir = Some(take_value(args, &mut i)?.parse()?),
            "--maxnum" => {
                report.maxnum = Some(parse_number("--maxnum", take_value(args, &mut i)?)?);
            }
            "--test-prefix" => report.test_prefix = take_value(args, &mut i)?.to_string(),
            "--top" => report.top = parse_number("--top", take_value(args, &mut i)?)?,
            "--json" => report.json = true,
            "--jobs" => report.jobs = parse_jobs(take_value(args, &mut i)?)?,
            "--quiet" => report.quiet = true,
            "--progress-interval" => {
                report.progress_interval_secs = Some(parse_interval(take_value(args, &mut i)?)?);
            }
            arg if !arg.starts_with("--") => {
                if report.mailboxes_dir.is_empty() {
                    report.mailboxes_dir = arg.to_string();
                } else {
                    return Err(format!("Unexpected argument: {arg}"));
                }
            }
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    if report.mailboxes_dir.is_empty() {
        return Err("Missing required argument: MAILBOXES_DIR".to_string());
    }

    Ok(report)
}
