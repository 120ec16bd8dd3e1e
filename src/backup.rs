//! The capture workflow: open a session, learn the device hostname, pull the
//! diagnostic dump and write it to a timestamped file.

use chrono::{Local, NaiveDateTime};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::session::{CommandSession, ConnectionParams, SessionOpener};

pub const DEFAULT_HOSTNAME_COMMAND: &str = "show run | include hostname";
pub const DEFAULT_TECH_COMMAND: &str = "show tech";
pub const DEFAULT_TECH_WAIT_BUDGET: Duration = Duration::from_secs(300);
pub const DEFAULT_FILENAME_SUFFIX: &str = "_show_tech.txt";

/// `MM_DD_YY__HH_MM`
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%y__%H_%M";

const HOSTNAME_KEYWORD: &str = "hostname";

/// Same-minute re-runs get `_2`, `_3`, ... appended. Past this many the
/// directory is assumed to be broken rather than busy.
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Source of the timestamp put in the file name.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, which is what an operator expects to see in the file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Directory the dump is written to. Created when missing.
    pub output_dir: PathBuf,
    /// Command whose output carries a `hostname <name>` line.
    pub hostname_command: String,
    /// The diagnostic dump command.
    pub tech_command: String,
    /// How long the diagnostic command may run before the capture is abandoned.
    pub tech_wait_budget: Duration,
    pub filename_suffix: String,
}

impl BackupConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            hostname_command: DEFAULT_HOSTNAME_COMMAND.to_string(),
            tech_command: DEFAULT_TECH_COMMAND.to_string(),
            tech_wait_budget: DEFAULT_TECH_WAIT_BUDGET,
            filename_suffix: DEFAULT_FILENAME_SUFFIX.to_string(),
        }
    }

    pub fn hostname_command(mut self, command: impl Into<String>) -> Self {
        self.hostname_command = command.into();
        self
    }

    pub fn tech_command(mut self, command: impl Into<String>) -> Self {
        self.tech_command = command.into();
        self
    }

    pub fn tech_wait_budget(mut self, budget: Duration) -> Self {
        self.tech_wait_budget = budget;
        self
    }

    pub fn filename_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.filename_suffix = suffix.into();
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub hostname: String,
    pub path: PathBuf,
    pub bytes_written: usize,
}

impl BackupReport {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pulls the device hostname out of configuration output.
///
/// Lines are scanned in order. The first line whose first whitespace-delimited
/// token is `hostname` must carry the name as its second token; that token is
/// returned. Lines that merely mention the word elsewhere (`ip domain lookup
/// hostname ...`) are skipped.
pub fn extract_hostname(output: &str, command: &str) -> Result<String, crate::Error> {
    let not_found = || crate::Error::HostnameNotFound {
        command: command.to_string(),
    };

    let line = output
        .lines()
        .find(|line| line.split_whitespace().next() == Some(HOSTNAME_KEYWORD))
        .ok_or_else(not_found)?;

    let hostname = line.split_whitespace().nth(1).ok_or_else(not_found)?;

    if !is_file_name_safe(hostname) {
        return Err(crate::Error::InvalidHostname(hostname.to_string()));
    }

    Ok(hostname.to_string())
}

fn is_file_name_safe(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `{hostname}_{MM_DD_YY__HH_MM}{suffix}`
pub fn backup_filename(hostname: &str, timestamp: &str, suffix: &str) -> String {
    format!("{hostname}_{timestamp}{suffix}")
}

/// Writes `contents` into a new file named `file_name` under `dir`.
///
/// The directory is created if needed. An existing file is never
/// overwritten: a counter is inserted before the extension instead
/// (`sw1_..._show_tech_2.txt`).
pub fn persist(dir: &Path, file_name: &str, contents: &[u8]) -> Result<PathBuf, crate::Error> {
    persist_with(dir, file_name, |file| {
        file.write_all(contents)?;
        file.flush()
    })
}

/// The contents go to a temporary file in `dir` first and only get their
/// final name once `fill` succeeded, so a failed write leaves nothing behind.
fn persist_with<F>(dir: &Path, file_name: &str, fill: F) -> Result<PathBuf, crate::Error>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    fs::create_dir_all(dir).map_err(|e| crate::Error::filesystem(dir, e))?;

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| crate::Error::filesystem(dir, e))?;
    fill(staged.as_file_mut()).map_err(|e| crate::Error::filesystem(dir.join(file_name), e))?;

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    for attempt in 1..=MAX_COLLISION_SUFFIX {
        let candidate = match (attempt, extension) {
            (1, _) => file_name.to_string(),
            (n, Some(ext)) => format!("{stem}_{n}.{ext}"),
            (n, None) => format!("{stem}_{n}"),
        };
        let path = dir.join(&candidate);

        match staged.persist_noclobber(&path) {
            Ok(_) => {
                if attempt > 1 {
                    tracing::warn!(
                        file = %candidate,
                        "a capture with the same name already exists, wrote alongside it"
                    );
                }
                return Ok(path);
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => staged = e.file,
            Err(e) => return Err(crate::Error::filesystem(&path, e.error)),
        }
    }

    Err(crate::Error::filesystem(
        dir.join(file_name),
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "too many captures with the same name",
        ),
    ))
}

/// Runs the whole capture against one device.
///
/// Once the session is open it is closed exactly once, whatever happens
/// afterwards. When the capture itself failed, that error is returned and a
/// failing close is only logged.
pub async fn run_backup<O, C>(
    opener: &O,
    params: &ConnectionParams,
    config: &BackupConfig,
    clock: &C,
) -> Result<BackupReport, crate::Error>
where
    O: SessionOpener,
    C: Clock,
{
    let mut session = opener.open(params).await?;

    let outcome = capture(&mut session, config, clock).await;
    let closed = session.close().await;

    match (outcome, closed) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(report), Err(e)) => {
            tracing::warn!(error = %e, "capture saved but the session did not close cleanly");
            Ok(report)
        }
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::debug!(error = %close_err, "closing after a failed capture also failed");
            }
            Err(e)
        }
    }
}

async fn capture<S, C>(
    session: &mut S,
    config: &BackupConfig,
    clock: &C,
) -> Result<BackupReport, crate::Error>
where
    S: CommandSession + ?Sized,
    C: Clock,
{
    let budget = session.default_wait_budget();
    let result = session.send_command(&config.hostname_command, budget).await?;
    reject_if_refused(&config.hostname_command, &result)?;
    let hostname = extract_hostname(&result.text(), &config.hostname_command)?;
    tracing::info!(%hostname, "device identified");

    let timestamp = format_timestamp(clock.now());
    let file_name = backup_filename(&hostname, &timestamp, &config.filename_suffix);

    tracing::info!(
        command = %config.tech_command,
        wait_budget = ?config.tech_wait_budget,
        "collecting diagnostic dump"
    );
    let dump = session
        .send_command(&config.tech_command, config.tech_wait_budget)
        .await?;
    reject_if_refused(&config.tech_command, &dump)?;

    let path = persist(&config.output_dir, &file_name, &dump.output)?;
    tracing::info!(path = %path.display(), bytes = dump.output.len(), "dump written");

    Ok(BackupReport {
        hostname,
        path,
        bytes_written: dump.output.len(),
    })
}

fn reject_if_refused(
    command: &str,
    result: &crate::DeviceCommandResult,
) -> Result<(), crate::Error> {
    match &result.error_match {
        Some(message) if result.has_error => Err(crate::Error::CommandRejected {
            command: command.to_string(),
            message: message.clone(),
        }),
        _ => Ok(()),
    }
}
