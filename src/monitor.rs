//! Session monitor: discovers terminals and drives the boundary filter.
//!
//! Everything here runs on the host's event-loop thread and never blocks on
//! I/O beyond a metadata check at session start; all writing happens on the
//! pipeline workers.

use crate::boundary::{CommandBoundaryFilter, LineClassifier};
use crate::error::MonitorError;
use crate::identity::IdentityRegistry;
use crate::menu::MenuEntry;
use crate::pipeline::{PipelineStats, Pipelines, ShutdownReport, StatsSnapshot};
use crate::session::{SessionRegistry, TerminalSession};
use crate::surface::{SurfaceHost, SurfaceId, TerminalSurface};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use term_autolog_config::Config;

/// Banner written at the top of both logs of a new identity.
pub fn session_banner(now: chrono::DateTime<chrono::Local>) -> String {
    format!(
        "=== Terminal session started at {} ===\n",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub struct SessionMonitor<H: SurfaceHost> {
    host: H,
    identities: Arc<IdentityRegistry>,
    filter: CommandBoundaryFilter,
    sessions: SessionRegistry,
    pipelines: Pipelines,
    stats: Arc<PipelineStats>,
    log_dir: PathBuf,
    /// Identities whose banner has been queued by this process
    bannered: HashSet<String>,
}

impl<H: SurfaceHost> SessionMonitor<H> {
    /// Build the filter from the prompt configuration and start both
    /// pipeline workers.
    pub fn new(
        host: H,
        identities: Arc<IdentityRegistry>,
        config: &Config,
    ) -> Result<Self, MonitorError> {
        let filter = CommandBoundaryFilter::new(LineClassifier::new(&config.prompt)?);
        let stats = Arc::new(PipelineStats::default());
        let pipelines = Pipelines::start(config, Arc::clone(&stats))?;
        let log_dir = config.logs_dir();
        log::info!("Session logs go to {}", log_dir.display());

        Ok(Self {
            host,
            identities,
            filter,
            sessions: SessionRegistry::new(),
            pipelines,
            stats,
            log_dir,
            bannered: HashSet::new(),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn session(&self, surface: &SurfaceId) -> Option<&TerminalSession> {
        self.sessions.get(surface)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start a session for every newly listed surface and retire sessions
    /// whose surface is gone. Returns the number of sessions started.
    pub fn poll(&mut self) -> usize {
        let surfaces = self.host.list_active_surfaces();
        let listed: HashSet<SurfaceId> = surfaces.iter().map(|s| s.surface_id()).collect();

        for gone in self
            .sessions
            .surface_ids()
            .into_iter()
            .filter(|id| !listed.contains(id))
        {
            log::info!("Surface {gone} closed");
            self.stop(&gone);
        }

        let mut started = 0;
        for surface in surfaces {
            if self.sessions.contains(&surface.surface_id()) {
                continue;
            }
            self.start_session(surface);
            started += 1;
        }
        started
    }

    fn start_session(&mut self, surface: Arc<dyn TerminalSurface>) {
        let surface_id = surface.surface_id();
        let id = self.identities.resolve(surface.as_ref());

        let initial_row = match surface.cursor_position() {
            Ok(cursor) => cursor.row,
            Err(e) => {
                log::debug!("No cursor for {surface_id} at start: {e}");
                PipelineStats::bump(&self.stats.host_errors);
                0
            }
        };
        let mut session = TerminalSession::new(id, surface, &self.log_dir, initial_row);

        match self.host.subscribe_contents_changed(&surface_id) {
            Ok(handle) => session.subscription = Some(handle),
            Err(e) => {
                log::warn!("Cannot subscribe to {surface_id}: {e}");
                PipelineStats::bump(&self.stats.host_errors);
            }
        }

        if self.is_fresh_log(&session) {
            self.bannered.insert(session.id.clone());
            let banner = session_banner(chrono::Local::now());
            self.pipelines.submit(
                session.raw_log_path.clone(),
                session.sanitized_log_path.clone(),
                &banner,
            );

            match self
                .filter
                .snapshot(session.surface.as_ref(), &mut session.boundary)
            {
                Ok(Some(chunk)) => emit(&self.pipelines, &self.stats, &session, &chunk),
                Ok(None) => {}
                Err(e) => {
                    log::debug!("Initial snapshot of {surface_id} failed: {e}");
                    PipelineStats::bump(&self.stats.host_errors);
                }
            }
        }

        log::info!(
            "Logging {} as {} -> {}",
            surface_id,
            session.id,
            session.raw_log_path.display()
        );
        self.sessions.insert(session);
    }

    /// No banner yet from this process and nothing on disk for this identity.
    fn is_fresh_log(&self, session: &TerminalSession) -> bool {
        if self.bannered.contains(&session.id) {
            return false;
        }
        std::fs::metadata(&session.raw_log_path)
            .map(|m| m.len() == 0)
            .unwrap_or(true)
    }

    /// Content-change notification for `surface`, delivered on the
    /// event-loop thread.
    pub fn on_contents_changed(&mut self, surface: &SurfaceId) {
        let Some(session) = self.sessions.get_mut(surface) else {
            log::trace!("Change for untracked surface {surface}");
            return;
        };

        match self
            .filter
            .on_contents_changed(session.surface.as_ref(), &mut session.boundary)
        {
            Ok(Some(chunk)) => emit(&self.pipelines, &self.stats, session, &chunk),
            Ok(None) => {}
            Err(e) => {
                log::debug!("Host query for {surface} failed: {e}");
                PipelineStats::bump(&self.stats.host_errors);
            }
        }
    }

    /// Stop logging `surface`. Returns `false` if it was not tracked.
    pub fn stop(&mut self, surface: &SurfaceId) -> bool {
        let Some(session) = self.sessions.remove(surface) else {
            return false;
        };
        if let Some(handle) = &session.subscription {
            self.host.unsubscribe(handle);
        }
        self.identities.forget_surface(surface);
        log::info!("Stopped logging {} ({})", surface, session.id);
        true
    }

    pub fn menu_entry(&self, surface: &SurfaceId) -> Option<MenuEntry> {
        self.sessions.get(surface).map(MenuEntry::for_session)
    }

    /// Menu entries for every live session, ordered by surface.
    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        self.sessions
            .surface_ids()
            .iter()
            .filter_map(|id| self.menu_entry(id))
            .collect()
    }

    /// Stop every session, then drain and stop both pipelines.
    pub fn shutdown(mut self) -> ShutdownReport {
        for surface in self.sessions.surface_ids() {
            self.stop(&surface);
        }
        self.pipelines.shutdown()
    }
}

fn emit(pipelines: &Pipelines, stats: &PipelineStats, session: &TerminalSession, chunk: &str) {
    PipelineStats::bump(&stats.chunks);
    log::trace!("Chunk for {} ({} bytes)", session.id, chunk.len());
    pipelines.submit(
        session.raw_log_path.clone(),
        session.sanitized_log_path.clone(),
        chunk,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_banner_format() {
        let at = chrono::Local
            .with_ymd_and_hms(2025, 3, 9, 14, 5, 7)
            .single()
            .unwrap();
        assert_eq!(
            session_banner(at),
            "=== Terminal session started at 2025-03-09 14:05:07 ===\n"
        );
    }
}
