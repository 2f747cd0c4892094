//! Shared integration test helpers for term-autolog.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{TestContext, KALI_HEADER, KALI_INPUT};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers is used per file.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use term_autolog::config::{Config, SanitizerConfig};
use term_autolog::identity::IdentityRegistry;
use term_autolog::monitor::SessionMonitor;
use term_autolog::surface::memory::{MemoryHost, MemorySurface};

/// First line of a two-line Kali-style prompt.
pub const KALI_HEADER: &str = "┌──(root㉿kali)-[~]";
/// Second, input-ready line of the same prompt.
pub const KALI_INPUT: &str = "└─# ";

/// Session timestamp used by [`TestContext::identities`].
pub const SESSION_TS: &str = "20250101_090000";

/// A sanitizer that copies stdin to the output file unchanged.
pub fn passthrough_sanitizer() -> SanitizerConfig {
    sh_sanitizer(r#"cat > "$1""#, 5)
}

/// A sanitizer that replaces `hunter2` with `[REDACTED]`.
pub fn redacting_sanitizer() -> SanitizerConfig {
    sh_sanitizer(r#"sed 's/hunter2/[REDACTED]/g' > "$1""#, 5)
}

/// A sanitizer that exits 1 for any chunk containing `FAIL`.
pub fn failing_sanitizer() -> SanitizerConfig {
    sh_sanitizer(
        r#"cat > "$1.in"; if grep -q FAIL "$1.in"; then rm -f "$1.in"; exit 1; fi; mv "$1.in" "$1""#,
        5,
    )
}

/// A sanitizer that never finishes within its one-second timeout.
pub fn hanging_sanitizer() -> SanitizerConfig {
    sh_sanitizer("cat > /dev/null; exec sleep 10", 1)
}

/// Run `script` under `sh -c`. Arguments arrive as `$0 = -o`, `$1 = <output>`.
pub fn sh_sanitizer(script: &str, timeout_secs: u64) -> SanitizerConfig {
    SanitizerConfig {
        enabled: true,
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        output_flag: "-o".to_string(),
        timeout_secs,
    }
}

/// Contents of `path`, or an empty string if it does not exist.
pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Files in `dir` whose names contain `needle`.
pub fn files_containing(dir: &Path, needle: &str) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().contains(needle))
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// A surface showing an idle Kali prompt on row 0, backed by `/dev/pts/<n>`.
pub fn idle_surface(id: &str, pts: i64) -> Arc<MemorySurface> {
    let surface = MemorySurface::new(id, 120).with_pty(pts, Some(&format!("/dev/pts/{pts}")));
    surface.set_row(0, KALI_INPUT);
    surface.set_cursor(KALI_INPUT.chars().count(), 0);
    Arc::new(surface)
}

/// Provides test isolation with automatic resource cleanup.
///
/// Wraps a `TempDir` and a `Config` whose log directory lives inside it,
/// with the sanitizer disabled and generous shutdown timeouts.
pub struct TestContext {
    /// Temporary directory, kept alive for the lifetime of the context.
    pub dir: TempDir,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.log_directory = dir.path().join("logs").to_string_lossy().into_owned();
        config.shutdown_timeout_ms = 10_000;
        config.sanitizer.enabled = false;
        Self { dir, config }
    }

    pub fn with_sanitizer(mut self, sanitizer: SanitizerConfig) -> Self {
        self.config.sanitizer = sanitizer;
        self
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config.logs_dir()
    }

    /// Raw and sanitized log paths for identifier `id`.
    pub fn log_paths(&self, id: &str) -> (PathBuf, PathBuf) {
        term_autolog::session::log_paths(&self.logs_dir(), id)
    }

    pub fn identities(&self) -> Arc<IdentityRegistry> {
        Arc::new(IdentityRegistry::with_session_timestamp(SESSION_TS))
    }

    /// A monitor over an in-memory host.
    pub fn monitor(&self, host: &Arc<MemoryHost>) -> SessionMonitor<Arc<MemoryHost>> {
        SessionMonitor::new(Arc::clone(host), self.identities(), &self.config)
            .expect("Failed to start monitor")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
