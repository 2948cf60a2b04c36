//! Server status state machine (`SPEC_FULL.md` §4.11).
//!
//! `(health, quiescent)` combine with optional progress counters or a structured error.
//! Once `(ok, true)` is reported for a steady workspace it stays so until a new event
//! reopens work — callers drive that by calling the named transition methods rather
//! than setting fields directly, so an invalid combination can't be constructed.

use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Coarse server health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Ok,
    Warning,
    Error,
}

/// A structured error accompanying a `warning`/`error` status, for clients that want
/// to branch on error identity rather than parse `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredError {
    pub code: String,
    pub details: String,
}

/// Optional indexing progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub files_indexed: usize,
    pub files_total: usize,
}

/// The engine's current reported status (`SPEC_FULL.md` §3 `ServerStatus`).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub health: Health,
    pub quiescent: bool,
    pub message: Option<String>,
    pub progress: Option<Progress>,
    pub error: Option<StructuredError>,
}

impl ServerStatus {
    fn new(health: Health, quiescent: bool, message: impl Into<String>) -> Self {
        Self { health, quiescent, message: Some(message.into()), progress: None, error: None }
    }

    fn boot() -> Self {
        Self::new(Health::Ok, false, "initializing")
    }
}

/// Minimum interval between progress updates the status machine will actually publish
/// (`SPEC_FULL.md` §4.11: "throttled to >=100 ms or at completion").
const PROGRESS_THROTTLE: Duration = Duration::from_millis(100);

/// Drives `ServerStatus` transitions and publishes the current value to subscribers.
pub struct StatusMachine {
    tx: watch::Sender<ServerStatus>,
    last_progress_publish: parking_lot::Mutex<Option<Instant>>,
}

impl StatusMachine {
    /// Creates a machine in the boot state `(ok, false, "initializing")`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerStatus::boot());
        Self { tx, last_progress_publish: parking_lot::Mutex::new(None) }
    }

    pub fn current(&self) -> ServerStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.tx.subscribe()
    }

    fn publish(&self, status: ServerStatus) {
        tracing::info!(health = ?status.health, quiescent = status.quiescent, message = ?status.message, "status transition");
        let _ = self.tx.send(status);
    }

    pub fn resolving(&self) {
        self.publish(ServerStatus::new(Health::Ok, false, "resolving"));
    }

    pub fn indexing_started(&self, total: usize) {
        let mut status = ServerStatus::new(Health::Ok, false, format!("indexing {total} files"));
        status.progress = Some(Progress { files_indexed: 0, files_total: total });
        *self.last_progress_publish.lock() = Some(Instant::now());
        self.publish(status);
    }

    /// Publishes indexing progress, throttled to the configured minimum interval
    /// unless `indexed == total` (completion always publishes).
    pub fn indexing_progress(&self, indexed: usize, total: usize) {
        let is_complete = indexed >= total;
        let mut gate = self.last_progress_publish.lock();
        let should_publish = is_complete || gate.map_or(true, |last| last.elapsed() >= PROGRESS_THROTTLE);
        if !should_publish {
            return;
        }
        *gate = Some(Instant::now());
        drop(gate);

        let mut status = ServerStatus::new(Health::Ok, false, format!("indexing {indexed}/{total} files"));
        status.progress = Some(Progress { files_indexed: indexed, files_total: total });
        self.publish(status);
    }

    pub fn indexing_complete(&self) {
        self.publish(ServerStatus::new(Health::Ok, true, "ready"));
    }

    pub fn resolution_failed(&self, message: impl Into<String>, error: StructuredError) {
        let mut status = ServerStatus::new(Health::Warning, true, message);
        status.error = Some(error);
        self.publish(status);
    }

    pub fn fatal(&self, message: impl Into<String>) {
        self.publish(ServerStatus::new(Health::Error, true, message));
    }
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}
