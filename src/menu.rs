//! Informational menu entry shown for each logged terminal.

use crate::session::TerminalSession;
use std::fmt;

/// A display-only menu item. Always disabled; it carries no action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub enabled: bool,
}

impl MenuEntry {
    pub fn for_session(session: &TerminalSession) -> Self {
        let file = session
            .sanitized_log_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            label: format!("Logging: {} -> {}", session.id, file),
            enabled: false,
        }
    }
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
