//! Palisade logging.
//!
//! A small, dependency-light logger driven by environment variables. Every
//! Palisade crate logs through the macros exported here so that a host can
//! silence or enable the guard's diagnostics without wiring a subscriber.
//!
//! # Usage
//!
//! ```rust
//! use palisade_log::{debug, info, warn};
//!
//! debug!("issuing token pair");
//! info!("storage limit set to {}", 200);
//! warn!(target: "palisade::csrf", "validation failed for {}", "/account");
//! ```
//!
//! # Environment Variables
//!
//! - `PALISADE_DEBUG=1` - shorthand for `PALISADE_LOG_LEVEL=debug`
//! - `PALISADE_LOG_LEVEL=trace|debug|info|warn|error|off`
//! - `PALISADE_LOG_FORMAT=json|text`

use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Disables all output
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One JSON object per line
    Json,
    /// Human-readable single line
    Text,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "text" | "pretty" | "compact" => Some(Format::Text),
            _ => None,
        }
    }
}

/// Minimum enabled level, readable without touching the lazy config.
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(|| {
    let config = LogConfig::from_env();
    MIN_LEVEL.store(config.level as u8, Ordering::SeqCst);
    config
});

/// Logger configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: Format,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
        }
    }
}

impl LogConfig {
    /// Read `PALISADE_DEBUG`, `PALISADE_LOG_LEVEL` and `PALISADE_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("PALISADE_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = lookup("PALISADE_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("PALISADE_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        Self { level, format }
    }
}

/// Force configuration to load now instead of on first log call.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Whether records at `level` are currently emitted.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    init();
    level != Level::Off && level as u8 >= MIN_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    init();
    Level::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

/// Override the minimum level at runtime.
pub fn set_level(level: Level) {
    init();
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Emit a record. Called by the macros; prefer those.
#[doc(hidden)]
pub fn emit(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }

    let line = match config().format {
        Format::Json => render_json(level, target, message),
        Format::Text => render_text(level, target, message),
    };

    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

fn render_text(level: Level, target: &str, message: &str) -> String {
    let now = chrono::Local::now();
    format!(
        "{} {:5} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level.as_str(),
        target,
        message
    )
}

#[cfg(feature = "json")]
fn render_json(level: Level, target: &str, message: &str) -> String {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Record<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let record = Record {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    serde_json::to_string(&record).unwrap_or_else(|_| render_text(level, target, message))
}

#[cfg(not(feature = "json"))]
fn render_json(level: Level, target: &str, message: &str) -> String {
    render_text(level, target, message)
}

#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Trace, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Trace, module_path!(), $($arg)+)
    };
}

/// Log at debug level. Enabled by `PALISADE_DEBUG=1`.
///
/// ```rust
/// use palisade_log::debug;
///
/// let limit = 200;
/// debug!("evicting down to {}", limit);
/// debug!(target: "palisade::store", "store cleared");
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Warn, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Warn, module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Error, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Error, module_path!(), $($arg)+)
    };
}

// Formatting is skipped entirely when the level is disabled.
#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::emit($level, $target, &format!($($arg)+));
        }
    };
}
