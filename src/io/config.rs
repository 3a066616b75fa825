//! Reader for the `[params]` section of `chatmail.ini`
//!
//! Only the keys the retention tooling needs are interpreted; every other key
//! is accepted and ignored so the same file can serve the whole deployment.

use crate::services::retention::{LARGE_MESSAGE_BYTES, RetentionThresholds};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const PARAMS_SECTION: &str = "params";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub path: PathBuf,
    pub mail_domain: String,
    pub mailboxes_dir: PathBuf,
    pub delete_mails_after: u32,
    pub delete_large_after: u32,
    pub delete_inactive_users_after: u32,
}

impl Config {
    #[must_use]
    pub fn thresholds(&self) -> RetentionThresholds {
        RetentionThresholds {
            delete_mails_after: self.delete_mails_after,
            delete_large_after: self.delete_large_after,
            delete_inactive_users_after: self.delete_inactive_users_after,
            large_message_size: LARGE_MESSAGE_BYTES,
        }
    }
}

/// Read and validate a config file.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("cannot read config {}: {err}", path.display()))
    })?;
    parse_config(path, &content)
}

/// Parse config text; `path` is only used for messages and `Config::path`.
pub fn parse_config(path: &Path, content: &str) -> Result<Config> {
    let params = parse_section(content, PARAMS_SECTION).ok_or_else(|| {
        Error::Config(format!("{}: missing [{PARAMS_SECTION}] section", path.display()))
    })?;

    let mail_domain = params
        .get("mail_domain")
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| Error::Config(format!("{}: mail_domain is required", path.display())))?;

    let mailboxes_dir = params
        .get("mailboxes_dir")
        .filter(|value| !value.is_empty())
        .map_or_else(
            || PathBuf::from(format!("/home/vmail/mail/{mail_domain}")),
            PathBuf::from,
        );

    let days = |key: &str, default: u32| -> Result<u32> {
        match params.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| {
                Error::Config(format!(
                    "{}: {key} must be a whole number of days, got '{value}'",
                    path.display()
                ))
            }),
        }
    };

    Ok(Config {
        path: path.to_path_buf(),
        delete_mails_after: days("delete_mails_after", 20)?,
        delete_large_after: days("delete_large_after", 7)?,
        delete_inactive_users_after: days("delete_inactive_users_after", 100)?,
        mail_domain,
        mailboxes_dir,
    })
}

/// Collect `key = value` pairs of one section, or `None` if it is absent.
///
/// Indented lines continue the previous value. `#` and `;` start comments.
fn parse_section(content: &str, wanted: &str) -> Option<HashMap<String, String>> {
    let mut found = false;
    let mut in_section = false;
    let mut values: HashMap<String, String> = HashMap::new();
    let mut last_key: Option<String> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim() == wanted;
            found |= in_section;
            last_key = None;
            continue;
        }
        if !in_section {
            continue;
        }

        let continuation = raw.starts_with(' ') || raw.starts_with('\t');
        if continuation && let Some(key) = &last_key {
            if let Some(value) = values.get_mut(key) {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line);
            }
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_string();
            values.insert(key.clone(), value.trim().to_string());
            last_key = Some(key);
        } else {
            log::debug!("Ignoring malformed config line: {line}");
        }
    }

    found.then_some(values)
}
