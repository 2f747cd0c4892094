//! Stable identifiers for terminal sessions.
//!
//! An identifier is anchored on the PTY device path, so a surface that the
//! host recreates (new wrapper object, same OS-level terminal) keeps logging
//! into the same files. Identifiers look like
//! `terminal_<fd>_pts<n>_<YYYYmmdd_HHMMSS>`; the timestamp is fixed for the
//! lifetime of the registry, which keeps identifiers unique across process
//! restarts without persistent storage.
//!
//! Construct one [`IdentityRegistry`] at process start and hand it (as an
//! `Arc`) to every component that resolves identities.

use crate::surface::{SurfaceId, TerminalSurface};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct IdentityState {
    /// Surface handle -> identifier, dropped when the surface stops logging
    surface_cache: HashMap<SurfaceId, String>,
    /// PTY path -> identifier, never removed
    pty_path_to_id: HashMap<String, String>,
    /// Every identifier handed out so far
    issued: HashSet<String>,
    /// Fallback counter for surfaces without PTY information
    counter: u64,
}

/// Process-wide identity assignment.
#[derive(Debug)]
pub struct IdentityRegistry {
    session_timestamp: String,
    state: Mutex<IdentityState>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    /// Create a registry stamped with the current local time.
    pub fn new() -> Self {
        Self::with_session_timestamp(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Create a registry with a fixed session timestamp.
    pub fn with_session_timestamp(timestamp: impl Into<String>) -> Self {
        Self {
            session_timestamp: timestamp.into(),
            state: Mutex::new(IdentityState::default()),
        }
    }

    pub fn session_timestamp(&self) -> &str {
        &self.session_timestamp
    }

    /// Identifier for `surface`. Never fails; surfaces without PTY
    /// information get a counter-based identifier.
    pub fn resolve(&self, surface: &dyn TerminalSurface) -> String {
        let surface_id = surface.surface_id();
        let mut state = self.state.lock();

        if let Some(id) = state.surface_cache.get(&surface_id) {
            return id.clone();
        }

        let id = match surface.pty_device() {
            Ok(device) => match device.path {
                Some(path) => {
                    if let Some(existing) = state.pty_path_to_id.get(&path) {
                        existing.clone()
                    } else {
                        let candidate = match pty_suffix(&path) {
                            Some(suffix) => format!(
                                "terminal_{}_{}_{}",
                                device.fd, suffix, self.session_timestamp
                            ),
                            None => format!("terminal_{}_{}", device.fd, self.session_timestamp),
                        };
                        let id = Self::claim(&mut state, candidate);
                        state.pty_path_to_id.insert(path, id.clone());
                        id
                    }
                }
                None => {
                    let candidate = format!("terminal_{}_{}", device.fd, self.session_timestamp);
                    Self::claim(&mut state, candidate)
                }
            },
            Err(e) => {
                log::debug!("No PTY for surface {surface_id} ({e}), using counter identity");
                state.counter += 1;
                let candidate = format!("terminal_{}_{}", state.counter, self.session_timestamp);
                Self::claim(&mut state, candidate)
            }
        };

        log::debug!("Resolved surface {surface_id} -> {id}");
        state.surface_cache.insert(surface_id, id.clone());
        id
    }

    /// Drop the surface-local cache entry. The PTY mapping stays, so the
    /// same terminal resolves to the same identifier if it comes back.
    pub fn forget_surface(&self, surface: &SurfaceId) {
        self.state.lock().surface_cache.remove(surface);
    }

    /// Identifier previously recorded for a PTY path.
    pub fn id_for_pty(&self, path: &str) -> Option<String> {
        self.state.lock().pty_path_to_id.get(path).cloned()
    }

    /// Reserve `candidate`, appending `_<n>` when another terminal already
    /// holds it.
    fn claim(state: &mut IdentityState, candidate: String) -> String {
        let mut id = candidate.clone();
        let mut n = 2;
        while state.issued.contains(&id) {
            id = format!("{candidate}_{n}");
            n += 1;
        }
        state.issued.insert(id.clone());
        id
    }
}

/// `pts<n>` for `/dev/pts/<n>`, the sanitized device name for other
/// paths (`/dev/ttys003` -> `ttys003`), `None` when nothing usable remains.
fn pty_suffix(path: &str) -> Option<String> {
    if let Some((_, num)) = path.rsplit_once("/dev/pts/") {
        return Some(format!("pts{num}"));
    }
    let name: String = path
        .rsplit('/')
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    (!name.is_empty()).then_some(name)
}
