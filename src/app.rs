//! The `run` loop: the single event-loop thread that drives the monitor.
//!
//! Discovery runs every `poll_interval_ms`; content changes are collected
//! from tmux on a shorter tick and dispatched to the monitor one surface at
//! a time. SIGINT/SIGTERM set a flag that ends the loop, after which both
//! pipelines are drained and stopped.

use crate::cli::RuntimeOptions;
use crate::identity::IdentityRegistry;
use crate::monitor::SessionMonitor;
use crate::surface::tmux::TmuxHost;
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use term_autolog_config::Config;

/// How often tmux is asked which panes changed.
const CHANGE_TICK: Duration = Duration::from_millis(100);

pub struct App {
    config: Config,
    exit_after: Option<Duration>,
    shutdown: Arc<AtomicBool>,
}

impl App {
    pub fn new(config: Config, options: &RuntimeOptions) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

        Ok(Self {
            config,
            exit_after: options
                .exit_after
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64),
            shutdown,
        })
    }

    pub fn run(self) -> Result<()> {
        let host = Arc::new(TmuxHost::new(&self.config.tmux_path));
        match host.version() {
            Ok(version) => log::info!("Using {version}"),
            Err(e) => log::warn!("tmux not reachable yet ({e}); waiting for a server"),
        }

        let identities = Arc::new(IdentityRegistry::new());
        let mut monitor = SessionMonitor::new(Arc::clone(&host), identities, &self.config)?;

        let started = Instant::now();
        let poll_interval = self.config.poll_interval();
        let mut last_poll: Option<Instant> = None;

        while !self.shutdown.load(Ordering::Relaxed) {
            if let Some(limit) = self.exit_after
                && started.elapsed() >= limit
            {
                log::info!("Exit timer reached");
                break;
            }

            if last_poll.is_none_or(|t| t.elapsed() >= poll_interval) {
                let new_sessions = monitor.poll();
                if new_sessions > 0 {
                    log::debug!("{new_sessions} new session(s)");
                }
                last_poll = Some(Instant::now());
            }

            for surface in host.take_changed() {
                monitor.on_contents_changed(&surface);
            }

            std::thread::sleep(CHANGE_TICK.min(poll_interval));
        }

        log::info!("Shutting down");
        let report = monitor.shutdown();
        if !report.sanitizer_stopped || !report.writer_stopped {
            log::warn!("A pipeline worker was abandoned at shutdown");
        }
        Ok(())
    }
}
