//! Entry point: parse the one CLI argument the spec allows, load any
//! existing snapshot, wire up Ctrl-C to a graceful shutdown, and run.
//!
//! Grounded on the teacher's `main.rs` control flow (parse args, load the
//! DB, log a timed "loaded from disk" notice, log the ready message,
//! enter the main loop) minus the config-file/daemonize/AOF paths this
//! crate's Non-goals exclude.

use std::env;
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use redlite::config::Config;
use redlite::log::{configure, log, LogLevel};
use redlite::server::Server;
use redlite::snapshot;
use redlite::store::Store;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    configure(config.verbosity, None);

    let store = Arc::new(Store::new());

    let start = Instant::now();
    if snapshot::load(&store, &config.db_filename) {
        log(
            LogLevel::Notice,
            &format!("DB loaded from disk: {:.3}s", start.elapsed().as_secs_f64()),
        );
    }

    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            log(LogLevel::Warning, &format!("Fatal error starting server: {e}"));
            exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        log(LogLevel::Warning, &format!("can't install signal handler: {e}"));
    }

    server.run();
    exit(0);
}
