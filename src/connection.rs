//! The per-connection session loop: frame requests off the socket,
//! dispatch each one against the shared store, and write the reply back
//! synchronously before framing the next one (spec.md §4.5).
//!
//! Grounded on the *shape* of the teacher's `handler.rs` accept/read loop
//! (an append buffer, repeatedly asking the framer for the next request,
//! dropping the consumed prefix) but retargeted from the single-threaded
//! `ae` event loop onto a blocking `std::net::TcpStream`, one OS thread
//! per connection, per SPEC_FULL.md §4.5.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use crate::commands::dispatch;
use crate::log::{log, LogLevel};
use crate::resp::{next_request, Reply};
use crate::store::Store;

const READ_CHUNK: usize = 1024;

/// Drives one accepted connection to completion. Returns once the peer
/// closes the socket or a read/write error occurs; never panics on I/O
/// failure.
pub fn handle_connection(mut stream: TcpStream, store: Arc<Store>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                log(LogLevel::Verbose, &format!("read error from {peer}: {e}"));
                break;
            }
        }

        loop {
            let Some((consumed, tokens)) = next_request(&buf) else {
                break;
            };
            let reply = dispatch(&tokens, &store);
            buf.drain(..consumed);
            if reply == Reply::None {
                continue;
            }
            if let Err(e) = stream.write_all(&reply.encode()) {
                log(LogLevel::Verbose, &format!("write error to {peer}: {e}"));
                return;
            }
        }
    }
}
