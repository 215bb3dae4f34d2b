//! Server configuration. Grounded on the teacher's `load_server_config`:
//! parse-or-fatal on the one knob the spec actually grants the CLI (the
//! port), hard-coded defaults for everything else.

use std::time::Duration;

use crate::log::LogLevel;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_DB_FILENAME: &str = "dump.my_rdb";
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_filename: String,
    pub snapshot_interval: Duration,
    pub verbosity: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            db_filename: DEFAULT_DB_FILENAME.to_string(),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            verbosity: LogLevel::Notice,
        }
    }
}

impl Config {
    /// Parses the single positional CLI argument spec.md §6 allows: a
    /// decimal port. Anything else is a usage error.
    pub fn from_args(args: &[String]) -> Result<Config, String> {
        let mut config = Config::default();
        match args.len() {
            0 => Ok(config),
            1 => {
                config.port = args[0]
                    .parse()
                    .map_err(|_| format!("invalid port '{}'", args[0]))?;
                Ok(config)
            }
            _ => Err("Usage: redlite-server [port]".to_string()),
        }
    }
}
