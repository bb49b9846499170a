//! Logger module
//!
//! Server lifecycle lines, access logging in several formats, remote API call
//! lines and per-step sample tracing. Messages never carry credentials.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        config.logging.is_debug(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn debug_enabled() -> bool {
    writer::get().is_some_and(writer::LogWriter::debug_enabled)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, samples: &[&str]) {
    write_info("======================================");
    write_info("E-signature sample server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Public URL: {}", config.samples.public_url));
    write_info(&format!("Remote API: {}", config.signnow.api_host));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info(&format!("Samples ({}):", samples.len()));
    for name in samples {
        write_info(&format!("  - http://{addr}/samples/{name}"));
    }
    write_info("======================================\n");
}

pub fn log_shutdown(active_connections: usize) {
    write_info(&format!(
        "[Shutdown] Stopped accepting connections, {active_connections} still in flight"
    ));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

/// One outbound request to the remote signing API
pub fn log_api_call(method: &str, path: &str, status: u16, elapsed: Duration) {
    write_info(&format!(
        "[SignNow] {method} {path} -> {status} ({}ms)",
        elapsed.as_millis()
    ));
}

/// Pipeline progress, only at debug level
pub fn log_step(sample: &str, message: &str) {
    if debug_enabled() {
        write_info(&format!("[Sample {sample}] {message}"));
    }
}

pub fn log_sample_error(sample: &str, err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] [Sample {sample}] {err}"));
}
