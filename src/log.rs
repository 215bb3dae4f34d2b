//! A small leveled logger, in the shape of the teacher's hand-rolled one:
//! a verbosity threshold, a `Display` char per level, one line per message.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::id;
use std::sync::Mutex;

use chrono::Local;
use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Verbose,
    Notice,
    Warning,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ch = match self {
            Self::Debug => '.',
            Self::Verbose => '-',
            Self::Notice => '*',
            Self::Warning => '#',
        };
        write!(f, "{ch}")
    }
}

struct Logger {
    verbosity: LogLevel,
    file: Option<String>,
}

static LOGGER: Lazy<Mutex<Logger>> = Lazy::new(|| {
    Mutex::new(Logger {
        verbosity: LogLevel::Verbose,
        file: None,
    })
});

/// Sets the minimum level that will be printed, and an optional log file path.
/// An empty or absent path logs to stdout, matching the teacher's convention.
pub fn configure(verbosity: LogLevel, file: Option<String>) {
    let mut logger = LOGGER.lock().unwrap();
    logger.verbosity = verbosity;
    logger.file = file;
}

pub fn log(level: LogLevel, body: &str) {
    let logger = LOGGER.lock().unwrap();
    if level < logger.verbosity {
        return;
    }

    let line = format!(
        "[{}] {} {} {}\n",
        id(),
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        body
    );

    match &logger.file {
        None => {
            let _ = io::stdout().write_all(line.as_bytes());
        }
        Some(path) => {
            if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = f.write_all(line.as_bytes());
            } else {
                eprintln!("can't open log file: {path}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Notice);
        assert!(LogLevel::Warning > LogLevel::Verbose);
    }

    #[test]
    fn level_display_chars() {
        assert_eq!(format!("{}", LogLevel::Debug), ".");
        assert_eq!(format!("{}", LogLevel::Warning), "#");
    }

    #[test]
    fn log_does_not_panic() {
        configure(LogLevel::Debug, None);
        log(LogLevel::Notice, "hello from a test");
    }
}
