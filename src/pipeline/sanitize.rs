//! Secret redaction through an external sanitizer process.
//!
//! Each chunk is fed to the sanitizer on stdin; the sanitizer writes the
//! redacted text to a staging file passed after the configured output flag.
//! On success the staged text is forwarded to the raw writer with the
//! sanitized log as its target, so sanitized output lands in the same order
//! the chunks were produced and the raw writer stays the only file owner.
//! The staging file is removed whatever the outcome.

use super::raw::RawWriteSender;
use super::{PipelineStats, Worker, offer};
use crate::error::{EnqueueError, SanitizeError};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use term_autolog_config::SanitizerConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Text waiting to be sanitized into `output_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeItem {
    pub text: String,
    pub output_path: PathBuf,
}

/// How to invoke the external sanitizer.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    command: String,
    args: Vec<String>,
    output_flag: String,
    timeout: Duration,
}

impl Sanitizer {
    pub fn from_config(config: &SanitizerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            output_flag: config.output_flag.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run the sanitizer over `text`, writing into `staging`, and return
    /// what it produced. Does not remove `staging`.
    pub fn run(&self, text: &str, staging: &Path) -> Result<String, SanitizeError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        if !self.output_flag.is_empty() {
            cmd.arg(&self.output_flag);
        }
        cmd.arg(staging)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| SanitizeError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        // Fed from a helper thread so a sanitizer that stops reading cannot
        // block the timeout below
        let stdin = child.stdin.take();
        let input = text.to_string();
        let feeder = std::thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes())?;
            }
            Ok(())
        });

        let status = wait_with_timeout(&mut child, self.timeout)?;
        let fed = feeder
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stdin feeder panicked")));

        let Some(status) = status else {
            return Err(SanitizeError::Timeout {
                secs: self.timeout.as_secs(),
            });
        };
        if !status.success() {
            return Err(SanitizeError::ExitStatus(status.code()));
        }
        if let Err(e) = fed
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(SanitizeError::Stdin(e));
        }
        if !staging.exists() {
            return Err(SanitizeError::MissingOutput(staging.to_path_buf()));
        }
        Ok(std::fs::read_to_string(staging)?)
    }
}

/// Poll `child` until it exits or `timeout` passes. `None` means it was
/// killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            if let Err(e) = child.kill() {
                log::warn!("Failed to kill sanitizer: {e}");
            }
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Per-item scratch file next to the sanitized log.
fn staging_path(output_path: &Path, seq: u64) -> PathBuf {
    let name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sanitized".to_string());
    output_path.with_file_name(format!(".{name}.{}.{seq}.staging", std::process::id()))
}

struct Running {
    tx: Sender<SanitizeItem>,
    worker: Worker,
}

/// Bounded queue plus the thread that runs the sanitizer.
///
/// When sanitization is disabled no thread is started and every enqueue
/// succeeds without doing anything.
pub struct SanitizationPipeline {
    running: Option<Running>,
    enqueue_timeout: Duration,
    stats: Arc<PipelineStats>,
}

impl SanitizationPipeline {
    pub fn start(
        config: &SanitizerConfig,
        capacity: usize,
        enqueue_timeout: Duration,
        raw: RawWriteSender,
        stats: Arc<PipelineStats>,
    ) -> std::io::Result<Self> {
        let running = if config.enabled {
            let (tx, rx) = bounded(capacity.max(1));
            let sanitizer = Sanitizer::from_config(config);
            let worker_stats = Arc::clone(&stats);
            let worker = Worker::spawn("log-sanitizer", move |shutdown| {
                run_sanitizer(rx, shutdown, sanitizer, raw, worker_stats)
            })?;
            Some(Running { tx, worker })
        } else {
            log::info!("Sanitization disabled, only raw logs will be written");
            None
        };
        Ok(Self {
            running,
            enqueue_timeout,
            stats,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.running.is_some()
    }

    pub fn enqueue(&self, text: String, output_path: PathBuf) -> Result<(), EnqueueError> {
        match &self.running {
            Some(running) => offer(
                &running.tx,
                SanitizeItem { text, output_path },
                self.enqueue_timeout,
                &self.stats,
            ),
            None => Ok(()),
        }
    }

    pub fn shutdown(self, timeout: Duration) -> bool {
        match self.running {
            Some(running) => running.worker.stop(timeout),
            None => true,
        }
    }
}

fn run_sanitizer(
    rx: Receiver<SanitizeItem>,
    shutdown: Receiver<()>,
    sanitizer: Sanitizer,
    raw: RawWriteSender,
    stats: Arc<PipelineStats>,
) {
    let mut seq = 0u64;
    let mut process = |item: SanitizeItem| {
        seq += 1;
        sanitize_item(&sanitizer, item, seq, &raw, &stats);
    };
    loop {
        select! {
            recv(rx) -> item => match item {
                Ok(item) => process(item),
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }
    for item in rx.try_iter() {
        process(item);
    }
}

fn sanitize_item(
    sanitizer: &Sanitizer,
    item: SanitizeItem,
    seq: u64,
    raw: &RawWriteSender,
    stats: &PipelineStats,
) {
    if item.text.is_empty() {
        return;
    }
    if let Some(parent) = item.output_path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        log::error!("Cannot create {}: {}", parent.display(), e);
        PipelineStats::bump(&stats.sanitize_failures);
        return;
    }

    let staging = staging_path(&item.output_path, seq);
    let result = sanitizer.run(&item.text, &staging);
    if staging.exists()
        && let Err(e) = std::fs::remove_file(&staging)
    {
        log::warn!("Failed to remove {}: {}", staging.display(), e);
    }

    match result {
        Ok(text) => {
            PipelineStats::bump(&stats.sanitized);
            if text.is_empty() {
                return;
            }
            if let Err(e) = raw.enqueue(item.output_path.clone(), text) {
                log::warn!(
                    "Sanitized output for {} dropped: {}",
                    item.output_path.display(),
                    e
                );
            }
        }
        Err(e) => {
            if matches!(e, SanitizeError::Timeout { .. }) {
                PipelineStats::bump(&stats.sanitize_timeouts);
            }
            PipelineStats::bump(&stats.sanitize_failures);
            log::warn!(
                "Sanitization for {} failed: {}",
                item.output_path.display(),
                e
            );
        }
    }
}
