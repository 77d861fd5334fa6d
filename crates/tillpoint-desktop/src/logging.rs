//! Logging setup.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging options supplied by the host application.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Level for Tillpoint crates (error, warn, info, debug, trace).
    pub level: String,
    /// Also log to stdout.
    pub console: bool,
    /// Directory for rolling log files; `None` uses the platform data dir.
    pub directory: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: false,
            directory: None,
        }
    }
}

/// Get the logs directory path.
pub fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "tillpoint", "Tillpoint").map(|dirs| dirs.data_dir().join("logs"))
}

/// Builds the filter: `RUST_LOG` if set, otherwise `tillpoint=<level>,warn`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tillpoint={},warn", level)))
}

/// Initialize logging with file rotation.
///
/// Keep the returned guard alive for the lifetime of the process, otherwise
/// buffered file output is lost.
pub fn init(options: &LogOptions) -> Option<WorkerGuard> {
    let filter = env_filter(&options.level);

    if let Some(log_dir) = options.directory.clone().or_else(logs_dir) {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("tillpoint")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let result = if options.console {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().with_writer(std::io::stdout))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .try_init()
                } else {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .try_init()
                };

                if result.is_err() {
                    return None;
                }
                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::warn!("File logging unavailable, using console only");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = LogOptions::default();
        assert_eq!(options.level, "info");
        assert!(!options.console);
        assert!(options.directory.is_none());
    }

    #[test]
    fn logs_dir_is_under_data_dir() {
        if let Some(dir) = logs_dir() {
            assert!(dir.ends_with("logs"));
        }
    }

    #[test]
    fn init_writes_into_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = LogOptions {
            directory: Some(dir.path().to_path_buf()),
            ..LogOptions::default()
        };

        // Only the first subscriber in a test binary can be installed.
        if let Some(guard) = init(&options) {
            tracing::info!("hello");
            drop(guard);
            let files = std::fs::read_dir(dir.path()).unwrap().count();
            assert!(files >= 1);
        }
    }
}
