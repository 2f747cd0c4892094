//! Live logging sessions, one per monitored terminal surface.

use crate::boundary::{BoundaryState, FilterState};
use crate::surface::{SubscriptionHandle, SurfaceId, TerminalSurface};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Log file names for identity `id` under `log_dir`.
///
/// Returns `(raw, sanitized)`: `<id>_original.log` and `<id>.log`.
pub fn log_paths(log_dir: &Path, id: &str) -> (PathBuf, PathBuf) {
    (
        log_dir.join(format!("{id}_original.log")),
        log_dir.join(format!("{id}.log")),
    )
}

/// A terminal surface currently being logged.
pub struct TerminalSession {
    pub id: String,
    pub surface: Arc<dyn TerminalSurface>,
    pub raw_log_path: PathBuf,
    pub sanitized_log_path: PathBuf,
    pub boundary: BoundaryState,
    pub subscription: Option<SubscriptionHandle>,
}

impl TerminalSession {
    pub fn new(
        id: String,
        surface: Arc<dyn TerminalSurface>,
        log_dir: &Path,
        initial_row: usize,
    ) -> Self {
        let (raw_log_path, sanitized_log_path) = log_paths(log_dir, &id);
        Self {
            id,
            surface,
            raw_log_path,
            sanitized_log_path,
            boundary: BoundaryState::starting_at(initial_row),
            subscription: None,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.surface_id()
    }

    pub fn last_logged_row(&self) -> usize {
        self.boundary.last_logged_row
    }

    pub fn skipping_context(&self) -> bool {
        self.boundary.filter == FilterState::SkippingContext
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", &self.id)
            .field("surface", &self.surface.surface_id())
            .field("raw_log_path", &self.raw_log_path)
            .field("sanitized_log_path", &self.sanitized_log_path)
            .field("boundary", &self.boundary)
            .finish()
    }
}

/// Sessions keyed by host surface handle.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SurfaceId, TerminalSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, surface: &SurfaceId) -> bool {
        self.sessions.contains_key(surface)
    }

    pub fn insert(&mut self, session: TerminalSession) {
        self.sessions.insert(session.surface_id(), session);
    }

    pub fn remove(&mut self, surface: &SurfaceId) -> Option<TerminalSession> {
        self.sessions.remove(surface)
    }

    pub fn get(&self, surface: &SurfaceId) -> Option<&TerminalSession> {
        self.sessions.get(surface)
    }

    pub fn get_mut(&mut self, surface: &SurfaceId) -> Option<&mut TerminalSession> {
        self.sessions.get_mut(surface)
    }

    /// Surface handles of every live session, sorted.
    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &TerminalSession> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
