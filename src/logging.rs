//! Process-wide logger bootstrap.
//!
//! Logs always go to stderr so cron mail or the service manager captures
//! them. With a `log_dir`, a size-rotated file copy is kept as well.
//! Initialization is idempotent for identical arguments and never panics. An
//! unknown level falls back to `info` rather than leaving the process silent.

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const DEFAULT_LEVEL: &str = "info";
const LOG_FILE_BASENAME: &str = "odoo-contact-sync";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), String> {
    let (level, rejected) = match normalize_level(level) {
        Ok(level) => (level, None),
        Err(reason) => (DEFAULT_LEVEL, Some(reason)),
    };
    let log_dir = log_dir.map(Path::to_path_buf);

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = Logger::try_with_str(level).map_err(|err| format!("invalid log level `{level}`: {err}"))?;
        let logger = match &log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|err| format!("failed to create log directory `{}`: {err}", dir.display()))?;
                logger
                    .log_to_file(FileSpec::default().directory(dir.as_path()).basename(LOG_FILE_BASENAME))
                    .rotate(
                        Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                        Naming::Numbers,
                        Cleanup::KeepLogFiles(MAX_LOG_FILES),
                    )
                    .append()
                    .duplicate_to_stderr(Duplicate::All)
                    .format_for_files(flexi_logger::detailed_format)
            }
            None => logger.log_to_stderr(),
        };
        let handle = logger
            .format_for_stderr(flexi_logger::default_format)
            .write_mode(WriteMode::Direct)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        info!(
            "event=logging_init module=logging status=ok level={level} version={}",
            env!("CARGO_PKG_VERSION")
        );
        Ok(LoggingState { level, log_dir: log_dir.clone(), _logger: handle })
    })?;

    if state.level != level || state.log_dir != log_dir {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to reconfigure",
            state.level
        ));
    }
    if let Some(reason) = rejected {
        warn!("event=logging_init module=logging status=fallback level={level} error={reason}");
    }
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!("unsupported log level `{other}`; expected trace|debug|info|warn|error")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level(" WARNING ").unwrap(), "warn");
        assert_eq!(normalize_level("debug").unwrap(), "debug");
        assert!(normalize_level("loud").unwrap_err().contains("unsupported"));
    }

    #[test]
    fn init_is_idempotent_and_rejects_reconfiguration() {
        let dir = tempfile::tempdir().unwrap();
        init_logging("info", Some(dir.path())).unwrap();
        init_logging("INFO", Some(dir.path())).unwrap();

        assert!(init_logging("debug", Some(dir.path())).unwrap_err().contains("refusing"));
        assert!(init_logging("info", None).is_err());

        // An unknown level resolves to `info` instead of disabling output.
        init_logging("verbose", Some(dir.path())).unwrap();
        assert!(log::log_enabled!(log::Level::Info));
        assert!(!log::log_enabled!(log::Level::Debug));
    }
}
