//! In-memory terminal surface and host.
//!
//! [`MemorySurface`] is a plain grid of rows plus a cursor. Tests script a
//! shell session against it (print a prompt, type a command, emit output)
//! and the `filter` command loads a captured transcript into one.

use super::{CursorPosition, PtyDevice, SubscriptionHandle, SurfaceHost, SurfaceId, TerminalSurface};
use crate::error::HostError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct Grid {
    rows: Vec<String>,
    cursor: CursorPosition,
    columns: usize,
    pty: Option<PtyDevice>,
    unavailable: bool,
}

/// A terminal surface backed by a vector of rows.
#[derive(Debug)]
pub struct MemorySurface {
    id: SurfaceId,
    grid: Mutex<Grid>,
}

impl MemorySurface {
    /// Create an empty surface with the cursor at the origin.
    pub fn new(id: impl Into<String>, columns: usize) -> Self {
        Self {
            id: SurfaceId::new(id),
            grid: Mutex::new(Grid {
                rows: Vec::new(),
                cursor: CursorPosition::default(),
                columns,
                pty: None,
                unavailable: false,
            }),
        }
    }

    /// Attach a PTY descriptor and device path.
    pub fn with_pty(self, fd: i64, path: Option<&str>) -> Self {
        self.grid.lock().pty = Some(PtyDevice {
            fd,
            path: path.map(str::to_string),
        });
        self
    }

    /// Build a surface from a captured transcript, cursor on the last
    /// non-blank row.
    pub fn from_transcript(id: impl Into<String>, text: &str) -> Self {
        let rows: Vec<String> = text.lines().map(str::to_string).collect();
        let columns = rows
            .iter()
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0)
            .max(80);
        let last = rows.iter().rposition(|r| !r.trim().is_empty()).unwrap_or(0);
        let col = rows.get(last).map(|r| r.chars().count()).unwrap_or(0);
        let surface = Self::new(id, columns);
        {
            let mut grid = surface.grid.lock();
            grid.rows = rows;
            grid.cursor = CursorPosition { col, row: last };
        }
        surface
    }

    /// Replace the row at `row`, growing the grid as needed.
    pub fn set_row(&self, row: usize, text: &str) {
        let mut grid = self.grid.lock();
        if grid.rows.len() <= row {
            grid.rows.resize(row + 1, String::new());
        }
        grid.rows[row] = text.to_string();
    }

    pub fn set_cursor(&self, col: usize, row: usize) {
        self.grid.lock().cursor = CursorPosition { col, row };
    }

    /// Append `text` at the cursor and advance the cursor column, like
    /// keystrokes echoed by the shell.
    pub fn type_text(&self, text: &str) {
        let mut grid = self.grid.lock();
        let CursorPosition { row, .. } = grid.cursor;
        if grid.rows.len() <= row {
            grid.rows.resize(row + 1, String::new());
        }
        grid.rows[row].push_str(text);
        let col = grid.rows[row].chars().count();
        grid.cursor.col = col;
    }

    /// Write each line on the rows below the cursor and leave the cursor at
    /// the end of the last one.
    pub fn print_lines(&self, lines: &[&str]) {
        let mut grid = self.grid.lock();
        for line in lines {
            let row = grid.cursor.row + 1;
            if grid.rows.len() <= row {
                grid.rows.resize(row + 1, String::new());
            }
            grid.rows[row] = (*line).to_string();
            grid.cursor = CursorPosition {
                col: line.chars().count(),
                row,
            };
        }
    }

    /// Make every host query fail, as when the widget is being torn down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.grid.lock().unavailable = unavailable;
    }

    fn check(&self, grid: &Grid) -> Result<(), HostError> {
        if grid.unavailable {
            Err(HostError::SurfaceGone(self.id.to_string()))
        } else {
            Ok(())
        }
    }
}

impl TerminalSurface for MemorySurface {
    fn surface_id(&self) -> SurfaceId {
        self.id.clone()
    }

    fn text_range(
        &self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> Result<String, HostError> {
        let grid = self.grid.lock();
        self.check(&grid)?;
        if row_start > row_end {
            return Ok(String::new());
        }

        let mut lines = Vec::with_capacity(row_end - row_start + 1);
        for row in row_start..=row_end {
            let text = grid.rows.get(row).map(String::as_str).unwrap_or("");
            let from = if row == row_start { col_start } else { 0 };
            let to = if row == row_end { col_end } else { usize::MAX };
            let cells: String = text
                .chars()
                .skip(from)
                .take(to.saturating_sub(from))
                .collect();
            lines.push(cells);
        }
        Ok(lines.join("\n"))
    }

    fn cursor_position(&self) -> Result<CursorPosition, HostError> {
        let grid = self.grid.lock();
        self.check(&grid)?;
        Ok(grid.cursor)
    }

    fn row_count(&self) -> Result<usize, HostError> {
        let grid = self.grid.lock();
        self.check(&grid)?;
        Ok(grid.rows.len().max(grid.cursor.row + 1))
    }

    fn column_count(&self) -> Result<usize, HostError> {
        let grid = self.grid.lock();
        self.check(&grid)?;
        Ok(grid.columns)
    }

    fn pty_device(&self) -> Result<PtyDevice, HostError> {
        let grid = self.grid.lock();
        self.check(&grid)?;
        grid.pty
            .clone()
            .ok_or(HostError::Unavailable("memory surface has no pty"))
    }
}

/// A host whose surface list is edited directly by the caller.
#[derive(Debug, Default)]
pub struct MemoryHost {
    surfaces: Mutex<Vec<Arc<MemorySurface>>>,
    subscriptions: Mutex<HashMap<u64, SurfaceId>>,
    next_token: AtomicU64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_surface(&self, surface: Arc<MemorySurface>) {
        self.surfaces.lock().push(surface);
    }

    /// Drop a surface from the active list (the terminal was closed).
    pub fn remove_surface(&self, id: &SurfaceId) {
        self.surfaces.lock().retain(|s| &s.id != id);
    }

    pub fn is_subscribed(&self, id: &SurfaceId) -> bool {
        self.subscriptions.lock().values().any(|s| s == id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl SurfaceHost for MemoryHost {
    fn list_active_surfaces(&self) -> Vec<Arc<dyn TerminalSurface>> {
        self.surfaces
            .lock()
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn TerminalSurface>)
            .collect()
    }

    fn subscribe_contents_changed(
        &self,
        surface: &SurfaceId,
    ) -> Result<SubscriptionHandle, HostError> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.lock().insert(token, surface.clone());
        Ok(SubscriptionHandle {
            surface: surface.clone(),
            token,
        })
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.subscriptions.lock().remove(&handle.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_range_clips_columns_and_missing_rows() {
        let surface = MemorySurface::new("s", 80);
        surface.set_row(0, "first line");
        surface.set_row(2, "third line");

        assert_eq!(
            surface.text_range(0, 0, 2, 80).unwrap(),
            "first line\n\nthird line"
        );
        assert_eq!(surface.text_range(0, 6, 0, 10).unwrap(), "line");
        assert_eq!(surface.text_range(5, 0, 6, 80).unwrap(), "\n");
        assert_eq!(surface.text_range(3, 0, 1, 80).unwrap(), "");
    }

    #[test]
    fn test_typing_and_printing_move_cursor() {
        let surface = MemorySurface::new("s", 80);
        surface.type_text("$ ");
        surface.type_text("ls");
        assert_eq!(surface.cursor_position().unwrap(), CursorPosition { col: 4, row: 0 });

        surface.print_lines(&["a.txt", "b.txt"]);
        assert_eq!(surface.cursor_position().unwrap(), CursorPosition { col: 5, row: 2 });
        assert_eq!(surface.row_count().unwrap(), 3);
    }

    #[test]
    fn test_from_transcript_places_cursor_on_last_text_row() {
        let surface = MemorySurface::from_transcript("t", "$ ls\na.txt\n$ \n\n");
        assert_eq!(surface.cursor_position().unwrap().row, 2);
    }

    #[test]
    fn test_unavailable_surface_fails_queries() {
        let surface = MemorySurface::new("s", 80).with_pty(3, Some("/dev/pts/3"));
        surface.set_unavailable(true);
        assert!(surface.cursor_position().is_err());
        assert!(surface.pty_device().is_err());
        surface.set_unavailable(false);
        assert_eq!(surface.pty_device().unwrap().fd, 3);
    }

    #[test]
    fn test_host_subscriptions() {
        let host = MemoryHost::new();
        let surface = Arc::new(MemorySurface::new("a", 80));
        host.add_surface(Arc::clone(&surface));

        let handle = host.subscribe_contents_changed(&surface.surface_id()).unwrap();
        assert!(host.is_subscribed(&surface.surface_id()));
        host.unsubscribe(&handle);
        assert_eq!(host.subscription_count(), 0);

        host.remove_surface(&surface.surface_id());
        assert!(host.list_active_surfaces().is_empty());
    }
}
