//! Minimal `log` backend writing styled records to stderr.

use console::Style;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct CliLogger;

static LOGGER: CliLogger = CliLogger;

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let style = match record.level() {
            Level::Error => Style::new().red().bold(),
            Level::Warn => Style::new().yellow(),
            Level::Info => Style::new().cyan(),
            Level::Debug => Style::new().dim(),
            Level::Trace => Style::new().dim().italic(),
        };
        let tag = format!("[{:<5}]", record.level());
        eprintln!("{} {}: {}", style.apply_to(tag), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Maps `-v` repetitions to a level: warn, info, debug, trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(verbosity: u8) {
    // A second call keeps the first logger; only the level changes.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_for(verbosity));
}
