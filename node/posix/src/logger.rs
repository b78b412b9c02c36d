//! `log` backend printing to stdout

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

static LOGGER: StdoutLogger = StdoutLogger;
static START: OnceLock<Instant> = OnceLock::new();

/// Writes `[seconds] LEVEL target: message` lines to stdout
pub struct StdoutLogger;

impl StdoutLogger {
    /// Install as the global logger with the given maximum level.
    ///
    /// Fails if another logger is already installed.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        START.get_or_init(Instant::now);
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = START.get_or_init(Instant::now).elapsed();
        let mut out = std::io::stdout().lock();
        // a closed stdout is not worth aborting over
        let _ = writeln!(
            out,
            "[{:>10.3}] {:<5} {}: {}",
            elapsed.as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        StdoutLogger::init(LevelFilter::Debug).unwrap();
        assert!(StdoutLogger::init(LevelFilter::Trace).is_err());
        assert_eq!(log::max_level(), LevelFilter::Debug);

        log::info!("logger up");
        log::logger().flush();
    }
}
