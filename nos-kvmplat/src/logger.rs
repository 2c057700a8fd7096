//! Console logging backend
//!
//! Forwards `log` records to the console sink registered once the console
//! driver is up. Records emitted before that are dropped.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Once;

/// Console output routine supplied by the platform
pub type ConsoleSink = fn(&str);

#[cfg(feature = "verbose_logging")]
const MAX_LEVEL: LevelFilter = LevelFilter::Trace;
#[cfg(not(feature = "verbose_logging"))]
const MAX_LEVEL: LevelFilter = LevelFilter::Info;

pub struct ConsoleLogger {
    sink: Once<ConsoleSink>,
}

impl ConsoleLogger {
    const fn new() -> Self {
        Self { sink: Once::new() }
    }
}

struct Writer(ConsoleSink);

impl Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

fn level_tag(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= MAX_LEVEL
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(sink) = self.sink.get() {
            let mut writer = Writer(*sink);
            let _ = writeln!(writer, "[{}] {}", level_tag(record.level()), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger::new();

/// Install the console logger
///
/// Only the first sink is kept; if another logger is already installed the
/// call leaves it in place.
pub fn init(sink: ConsoleSink) {
    LOGGER.sink.call_once(|| sink);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(MAX_LEVEL);
    }
}
