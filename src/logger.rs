//! Logging
//!
//! Minimal `log` backend: every enabled record goes to stderr with a UTC
//! timestamp and its level, so stdout stays free for reports.

use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record};

pub struct Logger {
    level: LevelFilter,
}

impl Logger {
    /// Installs the global logger. Fails if one is already installed.
    pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_max_level(level);
        log::set_boxed_logger(Box::new(Logger { level }))
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // write errors are dropped, there is nowhere left to report them
            let _ = writeln!(
                std::io::stderr().lock(),
                "{} [{}] {}",
                chrono::Utc::now().format("%F %T%.3fZ"),
                record.level(),
                record.args(),
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
