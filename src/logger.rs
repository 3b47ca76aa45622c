//! Console logger.
//!
//! Progress goes to stdout without decoration so the output reads like a
//! normal interactive tool; warnings and errors go to stderr with a prefix.

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

/// Basic logger to stdout/stderr.
pub struct Logger {
    pub level: LevelFilter,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match record.level() {
            Level::Error => eprintln!("ERROR: {}", record.args()),
            Level::Warn => eprintln!("WARNING: {}", record.args()),
            Level::Info => println!("{}", record.args()),
            Level::Debug | Level::Trace => println!("  debug: {}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Set up logging. `verbose` enables debug output.
pub fn init(verbose: bool) -> Result<(), SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = Logger { level };
    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(level))
}
