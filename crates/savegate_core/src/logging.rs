//! Rolling file logger for hosts embedding savegate.
//!
//! # Responsibility
//! - Route the crate's `event=... module=...` lines (commit phases,
//!   rejections, staging, migrations) to size-rotated files.
//! - Record panics as single-line, truncated events.
//!
//! # Invariants
//! - One logger per process; re-initializing with the same `LogConfig` is a
//!   no-op and any other config is refused.
//! - Log lines never carry record payloads or actor identities.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "savegate";
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    config: LogConfig,
    handle: LoggerHandle,
}

/// Where and how verbosely savegate writes its log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Absolute directory holding `savegate*.log`.
    pub dir: PathBuf,
    pub max_file_bytes: u64,
    pub keep_files: usize,
}

impl LogConfig {
    /// Build-mode default level, 10 MiB files, five rotated files kept.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            level: default_log_level(),
            dir: dir.into(),
            max_file_bytes: 10 * 1024 * 1024,
            keep_files: 5,
        }
    }

    /// Parses `trace|debug|info|warn|error|off`, case-insensitively.
    pub fn with_level(mut self, level: &str) -> Result<Self, LoggingError> {
        let trimmed = level.trim();
        self.level = trimmed
            .parse::<LevelFilter>()
            .map_err(|_| LoggingError::UnsupportedLevel(trimmed.to_string()))?;
        Ok(self)
    }
}

/// Logger bootstrap failure.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// A logger with a different config is already running.
    AlreadyInitialized { active: LogConfig },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error|off"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyInitialized { active } => write!(
                f,
                "logging already running at `{}` with level `{}`",
                active.dir.display(),
                active.level
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::UnsupportedLevel(_) | Self::RelativeDir(_) | Self::AlreadyInitialized { .. } => {
                None
            }
        }
    }
}

/// Starts the process-wide file logger.
///
/// # Errors
/// - `RelativeDir` / `CreateDir` when `config.dir` is unusable.
/// - `Backend` when flexi_logger refuses to start.
/// - `AlreadyInitialized` when a logger with another config is running.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    if !config.dir.is_absolute() {
        return Err(LoggingError::RelativeDir(config.dir.clone()));
    }

    let active = ACTIVE.get_or_try_init(|| start(config))?;
    if &active.config != config {
        return Err(LoggingError::AlreadyInitialized {
            active: active.config.clone(),
        });
    }
    Ok(())
}

fn start(config: &LogConfig) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&config.dir).map_err(|source| LoggingError::CreateDir {
        dir: config.dir.clone(),
        source,
    })?;

    let spec = config.level.to_string().to_ascii_lowercase();
    let handle = Logger::try_with_str(&spec)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(config.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(config.max_file_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.keep_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=logging_init module=logging status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        spec,
        config.dir.display()
    );

    Ok(ActiveLogger {
        config: config.clone(),
        handle,
    })
}

/// Config of the running logger, if any.
pub fn logging_status() -> Option<LogConfig> {
    ACTIVE.get().map(|active| active.config.clone())
}

/// Forces buffered lines to disk; no-op before `init_logging`.
pub fn flush_logging() {
    if let Some(active) = ACTIVE.get() {
        active.handle.flush();
    }
}

/// `Debug` in debug builds, `Info` otherwise.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        let location = panic_info
            .location()
            .map_or_else(
                || "unknown".to_string(),
                |loc| format!("{}:{}", loc.file(), loc.line()),
            );
        error!(
            "event=panic module=logging status=error location={location} payload={}",
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(panic_info);
    }));
}

fn one_line(value: &str, max_chars: usize) -> String {
    let mut line: String = value
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max_chars)
        .collect();
    if value.chars().nth(max_chars).is_some() {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{one_line, LogConfig, LoggingError};
    use log::LevelFilter;

    #[test]
    fn level_parsing_is_case_insensitive_and_strict() {
        let config = LogConfig::new("/tmp/savegate").with_level(" WARN ").unwrap();
        assert_eq!(config.level, LevelFilter::Warn);

        let err = LogConfig::new("/tmp/savegate")
            .with_level("verbose")
            .unwrap_err();
        assert!(matches!(err, LoggingError::UnsupportedLevel(ref level) if level == "verbose"));
    }

    #[test]
    fn relative_directory_is_refused_before_touching_global_state() {
        let err = super::init_logging(&LogConfig::new("logs/dev")).unwrap_err();
        assert!(matches!(err, LoggingError::RelativeDir(_)));
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn panic_payload_is_flattened_and_truncated() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("abcdef", 3), "abc...");
        assert_eq!(one_line("abc", 3), "abc");
    }
}
