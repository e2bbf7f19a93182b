//! Logging setup for the engine and its tools.
//!
//! Installs a global tracing subscriber that writes to stdout and, unless the
//! settings disable it, to a per-launch log file in the application logs
//! directory. Only the newest log files are kept.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::app_dirs;
use crate::config::LoggingSettings;

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "churnguard";

static LOG_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// No base directory could be resolved for log files.
    #[error("No suitable directory available for logs")]
    NoLogDir,
    /// Failed to create or access the log directory.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to enumerate existing log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to format a timestamp for the log filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// The configured filter directive did not parse.
    #[error("Invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    /// Failed to create the log file for this launch.
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Initialize tracing according to `settings`.
///
/// Subsequent calls are no-ops. Failures are returned so callers can carry on
/// without logging.
pub fn init(settings: &LoggingSettings) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let env_filter = build_env_filter(&settings.level)?;
    let timer = build_timer();
    let stdout_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stdout);

    let (file_layer, guard, log_path) = if settings.file_output {
        let log_dir = app_dirs::logs_dir().map_err(map_app_dir_error)?;
        let log_file_name = format_log_file_name(now_local_or_utc())?;
        let log_path = log_dir.join(&log_file_name);
        ensure_file_exists(&log_path)?;
        let (file_writer, guard) =
            tracing_appender::non_blocking(rolling::never(&log_dir, log_file_name));
        prune_old_logs(&log_dir, MAX_LOG_FILES)?;
        let layer = fmt::layer()
            .with_ansi(false)
            .with_timer(timer)
            .with_writer(file_writer)
            .boxed();
        (Some(layer), Some(guard), Some(log_path))
    } else {
        (None, None, None)
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    match log_path {
        Some(path) => tracing::info!("Logging initialized; log file at {}", path.display()),
        None => tracing::info!("Logging initialized; file output disabled"),
    }
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Delete the oldest `.log` files in `dir` until at most `max_files` remain.
fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    if entries.len() <= max_files {
        return Ok(());
    }
    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len() - max_files;
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `RUST_LOG` wins; otherwise the configured directive.
fn build_env_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
        directive: directive.to_string(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> LoggingError {
    match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoLogDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn log_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn log_filename_has_timestamp_and_prefix() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = format_log_file_name(fixed).unwrap();
        assert_eq!(name, "churnguard_2023-11-14_22-13-20.log");
    }

    #[test]
    fn prune_keeps_newest_logs_and_ignores_other_files() {
        let dir = tempdir().unwrap();
        for idx in 0..12 {
            ensure_file_exists(&dir.path().join(format!("churnguard_{idx:02}.log"))).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        prune_old_logs(dir.path(), MAX_LOG_FILES).unwrap();
        let names = log_names(dir.path());
        assert_eq!(names.len(), MAX_LOG_FILES + 1);
        assert!(!names.contains(&"churnguard_00.log".to_string()));
        assert!(!names.contains(&"churnguard_01.log".to_string()));
        assert!(names.contains(&"churnguard_11.log".to_string()));
        assert!(names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn invalid_directive_is_reported() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(matches!(
            build_env_filter("churnguard=notalevel"),
            Err(LoggingError::Filter { .. })
        ));
        assert!(build_env_filter("churnguard=debug,info").is_ok());
    }
}
