//! Typed error types for the logging pipeline.
//!
//! Apart from [`MonitorError`], none of these reach the interactive user.
//! Each one is recovered where it happens (fallback value, dropped item,
//! discarded handle) and counted in
//! [`PipelineStats`](crate::pipeline::PipelineStats).

use std::path::PathBuf;
use thiserror::Error;

/// A query against the host terminal surface failed.
///
/// Recovered by returning an empty/fallback result; the boundary filter
/// simply does nothing that cycle.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host does not expose this information for the surface.
    #[error("host information unavailable: {0}")]
    Unavailable(&'static str),

    /// The surface was closed between enumeration and the query.
    #[error("surface {0} is gone")]
    SurfaceGone(String),

    /// A host helper command failed.
    #[error("host command '{command}' failed: {detail}")]
    Command {
        /// The command line that was run.
        command: String,
        /// Exit status or stderr summary.
        detail: String,
    },

    /// The host answered with something we could not interpret.
    #[error("unexpected host response: {0}")]
    Parse(String),
}

/// Appending to a raw log file failed.
///
/// Recovered by discarding the cached handle for that path; the next item
/// for the path re-opens it.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write to {path:?} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The external sanitizer failed for one item.
///
/// Recovered by skipping sanitized output for that item only.
#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("failed to spawn sanitizer '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to feed sanitizer stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("sanitizer timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("sanitizer exited with status {0:?}")]
    ExitStatus(Option<i32>),

    #[error("sanitizer succeeded but produced no output at {0:?}")]
    MissingOutput(PathBuf),

    #[error("sanitizer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An item could not be handed to a worker queue.
///
/// Recovered by dropping the item; logging is best-effort.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("queue full, item dropped")]
    Full,

    #[error("queue closed, item dropped")]
    Closed,
}

/// The monitor could not be started.
///
/// The only error that reaches the caller; everything after start-up is
/// recovered in place.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid prompt configuration: {0}")]
    Prompt(#[from] regex::Error),

    #[error("failed to start pipeline worker: {0}")]
    Spawn(#[from] std::io::Error),
}
