//! Console backend for the `log` facade used by the command line tool

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct ConsoleLogger {
    max_level: LevelFilter,
}

impl ConsoleLogger {
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Pick the level from the `--verbose` / `--quiet` switches.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        let level = if quiet {
            LevelFilter::Error
        } else if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        Self::new(level)
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Install as the global logger. Call once, at startup.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let level = self.max_level;
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(level);
        Ok(())
    }

    fn format(record: &Record) -> String {
        let msg = record.args().to_string();
        match record.level() {
            Level::Error => format!("{} {}", "error:".red().bold(), msg),
            Level::Warn => format!("{} {}", "warn:".yellow().bold(), msg),
            Level::Info => msg,
            Level::Debug | Level::Trace => format!("{}", msg.dimmed()),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("{}", Self::format(record));
    }

    fn flush(&self) {}
}
