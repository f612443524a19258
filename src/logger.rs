//! Level-tagged stderr logger for the binary.

use ansi_term::Colour::{Blue, Green, Purple, Red, Yellow};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

struct Logger;

static LOGGER: Logger = Logger;

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => Red.bold().paint("ERROR"),
            Level::Warn => Yellow.bold().paint("WARN "),
            Level::Info => Green.bold().paint("INFO "),
            Level::Debug => Blue.bold().paint("DEBUG"),
            Level::Trace => Purple.paint("TRACE"),
        };
        eprintln!("{tag} {}", record.args());
    }

    fn flush(&self) {}
}
