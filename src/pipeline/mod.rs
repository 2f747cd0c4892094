//! Background write pipelines.
//!
//! Two bounded queues, each drained by one worker thread:
//!
//! - [`raw::RawWritePipeline`] appends text to log files. It is the only
//!   owner of log file handles.
//! - [`sanitize::SanitizationPipeline`] runs each chunk through an external
//!   sanitizer and forwards the result to the raw writer, targeting the
//!   sanitized log.
//!
//! Producers never block for longer than the enqueue timeout; a full queue
//! drops the item and bumps a counter in [`PipelineStats`]. Shutdown
//! signals each worker, lets it drain what is already queued, and waits a
//! bounded time for it to finish.

pub mod raw;
pub mod sanitize;

use crate::error::EnqueueError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use raw::RawWritePipeline;
use sanitize::SanitizationPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use term_autolog_config::Config;

/// Diagnostic counters shared by every pipeline component.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub chunks: AtomicU64,
    pub enqueued: AtomicU64,
    pub dropped: AtomicU64,
    pub written: AtomicU64,
    pub write_errors: AtomicU64,
    pub sanitized: AtomicU64,
    pub sanitize_failures: AtomicU64,
    pub sanitize_timeouts: AtomicU64,
    pub host_errors: AtomicU64,
}

impl PipelineStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            chunks: load(&self.chunks),
            enqueued: load(&self.enqueued),
            dropped: load(&self.dropped),
            written: load(&self.written),
            write_errors: load(&self.write_errors),
            sanitized: load(&self.sanitized),
            sanitize_failures: load(&self.sanitize_failures),
            sanitize_timeouts: load(&self.sanitize_timeouts),
            host_errors: load(&self.host_errors),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Chunks produced by the boundary filter (banners excluded)
    pub chunks: u64,
    /// Items accepted by either queue
    pub enqueued: u64,
    /// Items rejected because a queue stayed full
    pub dropped: u64,
    /// Successful file appends
    pub written: u64,
    pub write_errors: u64,
    pub sanitized: u64,
    pub sanitize_failures: u64,
    pub sanitize_timeouts: u64,
    /// Failed host queries (surface gone, tmux error)
    pub host_errors: u64,
}

/// One append to one log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteItem {
    pub path: PathBuf,
    pub text: String,
}

/// Offer `item` to a bounded queue, waiting at most `timeout`.
pub(crate) fn offer<T>(
    tx: &Sender<T>,
    item: T,
    timeout: Duration,
    stats: &PipelineStats,
) -> Result<(), EnqueueError> {
    match tx.send_timeout(item, timeout) {
        Ok(()) => {
            PipelineStats::bump(&stats.enqueued);
            Ok(())
        }
        Err(crossbeam_channel::SendTimeoutError::Timeout(_)) => {
            PipelineStats::bump(&stats.dropped);
            Err(EnqueueError::Full)
        }
        Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
            PipelineStats::bump(&stats.dropped);
            Err(EnqueueError::Closed)
        }
    }
}

/// A named consumer thread with a shutdown signal and a completion signal.
pub(crate) struct Worker {
    name: String,
    shutdown_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn `body` on a new thread. `body` receives the shutdown signal
    /// and must return once it fires.
    pub(crate) fn spawn<F>(name: &str, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(Receiver<()>) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                body(shutdown_rx);
                let _ = done_tx.send(());
            })?;
        Ok(Self {
            name: name.to_string(),
            shutdown_tx,
            done_rx,
            handle,
        })
    }

    /// Signal shutdown and wait up to `timeout`. Returns `false` if the
    /// thread had to be abandoned.
    pub(crate) fn stop(self, timeout: Duration) -> bool {
        let _ = self.shutdown_tx.try_send(());
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) => {
                let _ = self.handle.join();
                log::debug!("{} stopped", self.name);
                true
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Completion sender dropped without signalling: the body panicked
                if let Err(e) = self.handle.join() {
                    log::error!("{} panicked: {:?}", self.name, e);
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "{} did not finish within {:?}, abandoning it",
                    self.name,
                    timeout
                );
                false
            }
        }
    }
}

/// Outcome of [`Pipelines::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub sanitizer_stopped: bool,
    pub writer_stopped: bool,
    pub stats: StatsSnapshot,
}

/// Both pipelines, wired together.
pub struct Pipelines {
    raw: RawWritePipeline,
    sanitizer: SanitizationPipeline,
    stats: Arc<PipelineStats>,
    shutdown_timeout: Duration,
}

impl Pipelines {
    pub fn start(config: &Config, stats: Arc<PipelineStats>) -> std::io::Result<Self> {
        let raw = RawWritePipeline::start(
            config.queue_capacity,
            config.enqueue_timeout(),
            Arc::clone(&stats),
        )?;
        let sanitizer = SanitizationPipeline::start(
            &config.sanitizer,
            config.queue_capacity,
            config.enqueue_timeout(),
            raw.sender(),
            Arc::clone(&stats),
        )?;
        Ok(Self {
            raw,
            sanitizer,
            stats,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Queue `text` for the raw log and, separately, for sanitization into
    /// the sanitized log. The two queues succeed or fail independently.
    pub fn submit(&self, raw_path: PathBuf, sanitized_path: PathBuf, text: &str) {
        if let Err(e) = self.raw.enqueue(raw_path.clone(), text.to_string()) {
            log::warn!("Raw log item for {} dropped: {}", raw_path.display(), e);
        }
        if let Err(e) = self.sanitizer.enqueue(text.to_string(), sanitized_path.clone()) {
            log::warn!(
                "Sanitization item for {} dropped: {}",
                sanitized_path.display(),
                e
            );
        }
    }

    /// Stop the sanitizer first (it feeds the raw writer), then the raw
    /// writer. Each gets the full shutdown timeout.
    pub fn shutdown(self) -> ShutdownReport {
        let sanitizer_stopped = self.sanitizer.shutdown(self.shutdown_timeout);
        let writer_stopped = self.raw.shutdown(self.shutdown_timeout);
        let stats = self.stats.snapshot();
        log::info!(
            "Pipelines stopped: {} written, {} dropped, {} write errors, {} sanitize failures",
            stats.written,
            stats.dropped,
            stats.write_errors,
            stats.sanitize_failures
        );
        ShutdownReport {
            sanitizer_stopped,
            writer_stopped,
            stats,
        }
    }
}
