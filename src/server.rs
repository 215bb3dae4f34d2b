//! The TCP listener and its accept loop, plus the periodic snapshot
//! timer and graceful shutdown (spec.md §4.5, §5).
//!
//! Grounded on the teacher's `server.rs` for the overall bind/listen/run
//! lifecycle and on `handler.rs`'s `server_cron` for the "wake up
//! periodically and maybe save" shape — both retargeted from the
//! teacher's single-threaded `ae` event loop onto `std::net` +
//! `std::thread`, per SPEC_FULL.md §4.5. SIGINT handling follows
//! `examples/original_source/src/RedisServer.cpp`'s `signalHandler`/
//! `shutdown` (flip a running flag, dump the database, close the socket).

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::connection::handle_connection;
use crate::log::{log, LogLevel};
use crate::snapshot;
use crate::store::Store;

/// How often the accept loop polls the shutdown flag while waiting for a
/// connection. Bounds the time spec.md §4.5 requires shutdown to be
/// observed in.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct Server {
    listener: TcpListener,
    store: Arc<Store>,
    config: Config,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Server, String> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .map_err(|e| format!("can't bind port {}: {e}", config.port))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| format!("can't set listener nonblocking: {e}"))?;
        Ok(Server {
            listener,
            store,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A clone-able handle callers can use to request shutdown, e.g. from
    /// a Ctrl-C handler.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Runs the accept loop and the periodic snapshot timer until
    /// shutdown is requested, then performs one final dump. Returns once
    /// both have stopped.
    pub fn run(&self) {
        let timer_shutdown = self.shutdown.clone();
        let timer_store = self.store.clone();
        let timer_path = self.config.db_filename.clone();
        let interval = self.config.snapshot_interval;
        let timer = thread::spawn(move || snapshot_timer(timer_store, timer_path, interval, timer_shutdown));

        log(
            LogLevel::Notice,
            &format!("The server is now ready to accept connections on port {}", self.config.port),
        );

        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    let store = self.store.clone();
                    thread::spawn(move || handle_connection(stream, store));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    log(LogLevel::Warning, &format!("accept error: {e}"));
                }
            }
        }

        log(LogLevel::Warning, "User requested shutdown, saving DB...");
        if snapshot::dump(&self.store, &self.config.db_filename) {
            log(LogLevel::Notice, &format!("DB saved to {}", self.config.db_filename));
        } else {
            log(LogLevel::Warning, "Error saving DB on shutdown");
        }

        let _ = timer.join();
        log(LogLevel::Notice, "Server Shutdown Complete");
    }
}

fn snapshot_timer(store: Arc<Store>, path: String, interval: Duration, shutdown: Arc<AtomicBool>) {
    // Sleep in short slices so shutdown is still observed promptly even
    // with a long configured interval.
    let slice = Duration::from_millis(200).min(interval);
    loop {
        let mut waited = Duration::ZERO;
        while waited < interval {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(slice);
            waited += slice;
        }
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        if snapshot::dump(&store, &path) {
            log(LogLevel::Verbose, "periodic snapshot saved");
        } else {
            log(LogLevel::Warning, "periodic snapshot failed");
        }
    }
}
