//! Production host adapter over the tmux command line.
//!
//! Every tmux pane is a terminal surface. Rows are absolute: row 0 is the
//! oldest line still in the pane's history, so the visible top row is
//! `history_size`. tmux reports no change events to a plain client, so
//! [`TmuxHost::take_changed`] diffs a per-pane cursor/history fingerprint
//! between ticks instead.
//!
//! Once a pane's history reaches tmux's `history-limit`, `history_size`
//! stops growing and absolute rows stop advancing; keep the limit generous.

use super::{CursorPosition, PtyDevice, SubscriptionHandle, SurfaceHost, SurfaceId, TerminalSurface};
use crate::error::HostError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const PANE_INFO_FORMAT: &str = "#{cursor_x}\t#{cursor_y}\t#{history_size}\t#{pane_height}\t#{pane_width}";
const LIST_FORMAT: &str = "#{pane_id}\t#{pane_tty}";
const FINGERPRINT_FORMAT: &str = "#{pane_id}\t#{cursor_x}\t#{cursor_y}\t#{history_size}";

/// Run tmux and return its stdout.
fn run_tmux(tmux_path: &str, args: &[&str]) -> Result<String, HostError> {
    let output = Command::new(tmux_path)
        .args(args)
        .output()
        .map_err(|e| HostError::Command {
            command: format!("{} {}", tmux_path, args.join(" ")),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(HostError::Command {
            command: format!("{} {}", tmux_path, args.join(" ")),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Geometry and cursor of one pane at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PaneInfo {
    cursor_x: usize,
    cursor_y: usize,
    history_size: usize,
    height: usize,
    width: usize,
}

impl PaneInfo {
    fn parse(line: &str) -> Result<Self, HostError> {
        let fields: Vec<usize> = line
            .trim()
            .split('\t')
            .map(|f| f.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|e| HostError::Parse(format!("pane info '{}': {}", line.trim(), e)))?;
        match fields.as_slice() {
            [cursor_x, cursor_y, history_size, height, width] => Ok(Self {
                cursor_x: *cursor_x,
                cursor_y: *cursor_y,
                history_size: *history_size,
                height: *height,
                width: *width,
            }),
            _ => Err(HostError::Parse(format!("pane info '{}'", line.trim()))),
        }
    }
}

/// One tmux pane.
#[derive(Debug, Clone)]
pub struct TmuxSurface {
    pane_id: SurfaceId,
    tty: Option<String>,
    tmux_path: String,
}

impl TmuxSurface {
    fn pane_info(&self) -> Result<PaneInfo, HostError> {
        let out = run_tmux(
            &self.tmux_path,
            &["display-message", "-p", "-t", self.pane_id.as_str(), PANE_INFO_FORMAT],
        )?;
        PaneInfo::parse(&out)
    }

    /// Numeric part of the pane id (`%12` -> 12).
    fn pane_number(&self) -> Option<i64> {
        self.pane_id.as_str().trim_start_matches('%').parse().ok()
    }
}

impl TerminalSurface for TmuxSurface {
    fn surface_id(&self) -> SurfaceId {
        self.pane_id.clone()
    }

    fn text_range(
        &self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> Result<String, HostError> {
        if row_start > row_end {
            return Ok(String::new());
        }
        let info = self.pane_info()?;
        // capture-pane addresses history with negative line numbers
        let start = row_start as i64 - info.history_size as i64;
        let end = row_end as i64 - info.history_size as i64;
        let out = run_tmux(
            &self.tmux_path,
            &[
                "capture-pane",
                "-p",
                "-t",
                self.pane_id.as_str(),
                "-S",
                &start.to_string(),
                "-E",
                &end.to_string(),
            ],
        )?;

        let lines: Vec<&str> = out.strip_suffix('\n').unwrap_or(&out).split('\n').collect();
        let last = lines.len().saturating_sub(1);
        let clipped: Vec<String> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let from = if i == 0 { col_start } else { 0 };
                let to = if i == last { col_end } else { usize::MAX };
                line.chars().skip(from).take(to.saturating_sub(from)).collect()
            })
            .collect();
        Ok(clipped.join("\n"))
    }

    fn cursor_position(&self) -> Result<CursorPosition, HostError> {
        let info = self.pane_info()?;
        Ok(CursorPosition {
            col: info.cursor_x,
            row: info.history_size + info.cursor_y,
        })
    }

    fn row_count(&self) -> Result<usize, HostError> {
        let info = self.pane_info()?;
        Ok(info.history_size + info.height)
    }

    fn column_count(&self) -> Result<usize, HostError> {
        Ok(self.pane_info()?.width)
    }

    fn pty_device(&self) -> Result<PtyDevice, HostError> {
        let fd = self
            .pane_number()
            .ok_or_else(|| HostError::Parse(format!("pane id {}", self.pane_id)))?;
        Ok(PtyDevice {
            fd,
            path: self.tty.clone(),
        })
    }
}

/// Host adapter enumerating every pane of the running tmux server.
#[derive(Debug)]
pub struct TmuxHost {
    tmux_path: String,
    subscriptions: Mutex<HashMap<u64, SurfaceId>>,
    fingerprints: Mutex<HashMap<SurfaceId, String>>,
    next_token: AtomicU64,
}

impl TmuxHost {
    pub fn new(tmux_path: impl Into<String>) -> Self {
        Self {
            tmux_path: tmux_path.into(),
            subscriptions: Mutex::new(HashMap::new()),
            fingerprints: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// tmux version string, or an error if the binary cannot be run.
    pub fn version(&self) -> Result<String, HostError> {
        run_tmux(&self.tmux_path, &["-V"]).map(|v| v.trim().to_string())
    }

    /// Subscribed panes whose cursor or history moved since the last call.
    ///
    /// The first observation of a pane counts as a change.
    pub fn take_changed(&self) -> Vec<SurfaceId> {
        let subscribed: Vec<SurfaceId> = self.subscriptions.lock().values().cloned().collect();
        if subscribed.is_empty() {
            return Vec::new();
        }

        let out = match run_tmux(&self.tmux_path, &["list-panes", "-a", "-F", FINGERPRINT_FORMAT]) {
            Ok(out) => out,
            Err(e) => {
                log::debug!("tmux fingerprint query failed: {e}");
                return Vec::new();
            }
        };

        let mut fingerprints = self.fingerprints.lock();
        let mut changed = Vec::new();
        for line in out.lines() {
            let Some((pane, fingerprint)) = line.split_once('\t') else {
                continue;
            };
            let id = SurfaceId::new(pane);
            if !subscribed.contains(&id) {
                continue;
            }
            if fingerprints.get(&id).map(String::as_str) != Some(fingerprint) {
                fingerprints.insert(id.clone(), fingerprint.to_string());
                changed.push(id);
            }
        }
        changed
    }
}

impl SurfaceHost for TmuxHost {
    fn list_active_surfaces(&self) -> Vec<Arc<dyn TerminalSurface>> {
        let out = match run_tmux(&self.tmux_path, &["list-panes", "-a", "-F", LIST_FORMAT]) {
            Ok(out) => out,
            Err(e) => {
                // No server running is the common case here
                log::trace!("tmux list-panes failed: {e}");
                return Vec::new();
            }
        };

        out.lines()
            .filter_map(|line| {
                let (pane, tty) = line.split_once('\t').unwrap_or((line, ""));
                if pane.is_empty() {
                    return None;
                }
                let surface = TmuxSurface {
                    pane_id: SurfaceId::new(pane),
                    tty: (!tty.is_empty()).then(|| tty.to_string()),
                    tmux_path: self.tmux_path.clone(),
                };
                Some(Arc::new(surface) as Arc<dyn TerminalSurface>)
            })
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
        self.fingerprints.lock().remove(&handle.surface);
    }
}
