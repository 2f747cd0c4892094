//! Narrow capability interface over the host terminal widget.
//!
//! The logging pipeline only ever reads from a surface: text ranges, the
//! cursor, the grid size, and the backing PTY. Two implementations ship:
//!
//! - [`memory`]: an in-memory grid used by tests and the `filter` command
//! - [`tmux`]: the production adapter, one surface per tmux pane

pub mod memory;
pub mod tmux;

use crate::error::HostError;
use std::fmt;
use std::sync::Arc;

/// Host-assigned handle of a terminal surface.
///
/// Only guaranteed unique among the surfaces the host currently lists;
/// the stable logging identity comes from [`IdentityRegistry`](crate::identity::IdentityRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cursor position in absolute rows (scrollback included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub col: usize,
    pub row: usize,
}

/// The pseudo-terminal backing a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyDevice {
    /// Descriptor (or the host's numeric stand-in for one)
    pub fd: i64,
    /// Device path such as `/dev/pts/3`, when the host can resolve it
    pub path: Option<String>,
}

/// Read-only view of one live terminal surface.
pub trait TerminalSurface: Send + Sync {
    fn surface_id(&self) -> SurfaceId;

    /// Text between two cells, rows inclusive, one `\n`-separated line per row.
    fn text_range(
        &self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> Result<String, HostError>;

    fn cursor_position(&self) -> Result<CursorPosition, HostError>;

    /// Number of rows currently addressable (visible rows plus scrollback).
    fn row_count(&self) -> Result<usize, HostError>;

    fn column_count(&self) -> Result<usize, HostError>;

    fn pty_device(&self) -> Result<PtyDevice, HostError>;
}

/// Token returned by [`SurfaceHost::subscribe_contents_changed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub surface: SurfaceId,
    pub token: u64,
}

/// Enumeration and change-notification side of the host.
///
/// Notifications are delivered on the event-loop thread by the host's
/// driver calling [`SessionMonitor::on_contents_changed`](crate::monitor::SessionMonitor::on_contents_changed)
/// for subscribed surfaces.
pub trait SurfaceHost {
    fn list_active_surfaces(&self) -> Vec<Arc<dyn TerminalSurface>>;

    fn subscribe_contents_changed(
        &self,
        surface: &SurfaceId,
    ) -> Result<SubscriptionHandle, HostError>;

    fn unsubscribe(&self, handle: &SubscriptionHandle);
}

impl<H: SurfaceHost + ?Sized> SurfaceHost for Arc<H> {
    fn list_active_surfaces(&self) -> Vec<Arc<dyn TerminalSurface>> {
        (**self).list_active_surfaces()
    }

    fn subscribe_contents_changed(
        &self,
        surface: &SurfaceId,
    ) -> Result<SubscriptionHandle, HostError> {
        (**self).subscribe_contents_changed(surface)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        (**self).unsubscribe(handle)
    }
}
