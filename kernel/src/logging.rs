//! Kernel logging facility
//!
//! Routes the `log` facade to COM1. Records are formatted as
//! `[LEVEL] target: message`. Log levels are configured based on build
//! configuration (debug/release).

use core::fmt;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

/// Global logger instance available throughout the kernel
pub static LOGGER: Logger = Logger::new();

/// Thread-safe logger implementation
pub struct Logger {
    inner: Mutex<()>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a new logger instance
    pub const fn new() -> Logger {
        Logger {
            inner: Mutex::new(()),
        }
    }
}

/// Display adapter for one log record.
pub struct Line<'a> {
    level: log::Level,
    target: &'a str,
    args: &'a fmt::Arguments<'a>,
}

impl<'a> Line<'a> {
    pub fn new(record: &'a Record<'a>) -> Self {
        Line {
            level: record.level(),
            target: record.target(),
            args: record.args(),
        }
    }
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.target, self.args)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _guard = self.inner.lock();
            crate::serial_println!("{}", Line::new(record));
        }
    }

    fn flush(&self) {}
}

/// Level used by both the kernel logger and the generator binary.
///
/// Debug builds log at `Debug`, release builds at `Info`.
pub const fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs [`LOGGER`] as the global logger. Call once, on the boot core.
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(default_level()))
}
