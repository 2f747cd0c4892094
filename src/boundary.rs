//! Command boundary detection.
//!
//! Decides *what* gets logged and *when*. A flush is triggered only when the
//! cursor has moved to a new row and that row is an input-ready prompt:
//! the previous command has finished and the shell is waiting again. The
//! rows between the last flush and the new prompt are then run through a
//! per-line classifier that drops noise:
//!
//! - excluded commands (`context ...`) and everything they print, up to the
//!   next prompt
//! - empty prompts, including prompts showing only a failed exit status
//! - partial input captured mid-keystroke
//! - internal `===` banner lines
//! - blank lines
//!
//! Prompt recognition is a configurable marker heuristic
//! ([`PromptConfig`]), not a shell parser.

use crate::error::HostError;
use crate::surface::TerminalSurface;
use regex::Regex;
use term_autolog_config::PromptConfig;

/// Classifier state carried across content-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// Every non-noise line is kept.
    #[default]
    Scanning,
    /// Inside an excluded command's output; lines are dropped until the
    /// next prompt.
    SkippingContext,
}

/// Per-session progress through the terminal buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundaryState {
    /// Row up to which content has been flushed. Never decreases.
    pub last_logged_row: usize,
    pub filter: FilterState,
}

impl BoundaryState {
    pub fn starting_at(row: usize) -> Self {
        Self {
            last_logged_row: row,
            filter: FilterState::Scanning,
        }
    }
}

/// What a prompt line looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind<'a> {
    /// First line of a multi-line prompt; carries no command.
    Header,
    /// Input-ready line, with whatever has been typed after the marker.
    Input { command: &'a str },
}

/// Why a line was left out of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Blank,
    ExcludedCommand,
    ExcludedOutput,
    SessionMarker,
    EmptyPrompt,
    PartialInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineVerdict {
    /// Kept, with trailing whitespace trimmed.
    Keep(String),
    Drop(DropReason),
}

/// Per-line rules, built from the configured marker set.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    header_prefixes: Vec<String>,
    input_prefixes: Vec<String>,
    input_separators: Vec<String>,
    excluded_commands: Vec<String>,
    session_marker: String,
    continuation_markers: Vec<String>,
    exit_status: Option<Regex>,
}

fn non_empty(items: &[String]) -> Vec<String> {
    items.iter().filter(|s| !s.is_empty()).cloned().collect()
}

/// True when `prefix` has no whitespace outside brackets, i.e. it reads as
/// a single prompt token like `user@host:~` or `[root@box ~]`. A bare
/// separator (`# API keys`, `$ cargo build`) is output, not a prompt.
fn is_prompt_token(prefix: &str) -> bool {
    if prefix.trim().is_empty() {
        return false;
    }
    let mut depth = 0usize;
    for c in prefix.chars() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return false,
            _ => {}
        }
    }
    true
}

/// `text` starts with the word `name` (`context`, `context wipe`, not `contextual`).
fn starts_with_word(text: &str, name: &str) -> bool {
    match text.strip_prefix(name) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

impl LineClassifier {
    pub fn new(config: &PromptConfig) -> Result<Self, regex::Error> {
        let exit_status = if config.failure_glyphs.is_empty() {
            None
        } else {
            let glyphs: Vec<String> = config
                .failure_glyphs
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect();
            Some(Regex::new(&format!(
                r"^\d+\s*(?:{})\s*$",
                glyphs.join("|")
            ))?)
        };

        Ok(Self {
            header_prefixes: non_empty(&config.header_prefixes),
            input_prefixes: non_empty(&config.input_prefixes),
            input_separators: config
                .input_separators
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect(),
            excluded_commands: non_empty(&config.excluded_commands),
            session_marker: config.session_marker.clone(),
            continuation_markers: non_empty(&config.continuation_markers),
            exit_status,
        })
    }

    /// Recognise a prompt line and extract the typed command.
    pub fn prompt_kind<'a>(&self, line: &'a str) -> Option<PromptKind<'a>> {
        let text = line.trim_start();
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return None;
        }

        if self.header_prefixes.iter().any(|p| trimmed.starts_with(p.as_str())) {
            return Some(PromptKind::Header);
        }

        if let Some(prefix) = self
            .input_prefixes
            .iter()
            .find(|p| trimmed.starts_with(p.as_str()))
        {
            return Some(PromptKind::Input {
                command: trimmed[prefix.len()..].trim(),
            });
        }

        for separator in &self.input_separators {
            if let Some(idx) = text.find(separator.as_str())
                && is_prompt_token(&text[..idx])
            {
                return Some(PromptKind::Input {
                    command: text[idx + separator.len()..].trim(),
                });
            }
            // Terminals trim the trailing space of an idle `user@host:~$ `
            let marker = separator.trim_end();
            if let Some(prefix) = trimmed.strip_suffix(marker)
                && is_prompt_token(prefix)
            {
                return Some(PromptKind::Input { command: "" });
            }
        }
        None
    }

    pub fn is_prompt(&self, line: &str) -> bool {
        self.prompt_kind(line).is_some()
    }

    /// Input-ready prompt: the shell is waiting for a command.
    pub fn is_input_prompt(&self, line: &str) -> bool {
        matches!(self.prompt_kind(line), Some(PromptKind::Input { .. }))
    }

    /// Start of an excluded region: after any prompt prefix, the text begins
    /// with a reserved command name.
    pub fn is_excluded_command(&self, line: &str) -> bool {
        let text = match self.prompt_kind(line) {
            Some(PromptKind::Input { command }) => command,
            Some(PromptKind::Header) => return false,
            None => line.trim(),
        };
        self.excluded_commands
            .iter()
            .any(|name| starts_with_word(text, name))
    }

    /// An input prompt with nothing typed, or showing only a failed exit
    /// status (`2 ⨯`).
    pub fn is_empty_prompt(&self, line: &str) -> bool {
        match self.prompt_kind(line) {
            Some(PromptKind::Input { command }) => {
                command.is_empty()
                    || self
                        .exit_status
                        .as_ref()
                        .is_some_and(|re| re.is_match(command))
            }
            _ => false,
        }
    }

    /// Input captured mid-keystroke: a very short non-prompt line that is
    /// not a number, or one ending in a cursor/continuation marker.
    pub fn is_partial_command(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        if self.is_prompt(trimmed) {
            return false;
        }
        if trimmed.chars().count() <= 2 && !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        self.continuation_markers
            .iter()
            .any(|m| trimmed.ends_with(m.as_str()))
    }

    pub fn is_session_marker(&self, line: &str) -> bool {
        !self.session_marker.is_empty() && line.trim().starts_with(&self.session_marker)
    }

    /// Classify one line, updating the skip state.
    pub fn classify(&self, line: &str, state: &mut FilterState) -> LineVerdict {
        let trimmed = line.trim();

        if self.is_excluded_command(trimmed) {
            *state = FilterState::SkippingContext;
            return LineVerdict::Drop(DropReason::ExcludedCommand);
        }

        if *state == FilterState::SkippingContext {
            if !self.is_prompt(trimmed) {
                return LineVerdict::Drop(DropReason::ExcludedOutput);
            }
            // A new prompt ends the excluded region and is judged like any line
            *state = FilterState::Scanning;
        }

        if trimmed.is_empty() {
            LineVerdict::Drop(DropReason::Blank)
        } else if self.is_session_marker(trimmed) {
            LineVerdict::Drop(DropReason::SessionMarker)
        } else if self.is_empty_prompt(trimmed) {
            LineVerdict::Drop(DropReason::EmptyPrompt)
        } else if self.is_partial_command(trimmed) {
            LineVerdict::Drop(DropReason::PartialInput)
        } else {
            LineVerdict::Keep(line.trim_end().to_string())
        }
    }

    /// Every line of `text` with its verdict, in order.
    pub fn explain<'a>(
        &self,
        text: &'a str,
        state: &mut FilterState,
    ) -> Vec<(&'a str, LineVerdict)> {
        text.split('\n')
            .map(|line| (line, self.classify(line, state)))
            .collect()
    }

    /// Lines of `text` that survive classification, in order.
    pub fn filter_lines(&self, text: &str, state: &mut FilterState) -> Vec<String> {
        self.explain(text, state)
            .into_iter()
            .filter_map(|(_, verdict)| match verdict {
                LineVerdict::Keep(kept) => Some(kept),
                LineVerdict::Drop(_) => None,
            })
            .collect()
    }

    /// Filter `text` into one committed chunk: kept lines joined with `\n`
    /// plus a trailing newline. `None` when nothing survives.
    pub fn filter_chunk(&self, text: &str, state: &mut FilterState) -> Option<String> {
        let lines = self.filter_lines(text, state);
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n") + "\n")
        }
    }
}

/// Turns content-change notifications into committed chunks.
#[derive(Debug, Clone)]
pub struct CommandBoundaryFilter {
    classifier: LineClassifier,
}

impl CommandBoundaryFilter {
    pub fn new(classifier: LineClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    /// Handle a content change. Returns the chunk to log, if a command has
    /// completed since the last flush.
    ///
    /// `last_logged_row` advances whenever a prompt is seen on a new row,
    /// whether or not anything was kept. Host failures leave the state
    /// untouched.
    pub fn on_contents_changed(
        &self,
        surface: &dyn TerminalSurface,
        state: &mut BoundaryState,
    ) -> Result<Option<String>, HostError> {
        let cursor = surface.cursor_position()?;
        if cursor.row <= state.last_logged_row {
            return Ok(None);
        }

        let columns = surface.column_count()?;
        let current = surface.text_range(cursor.row, 0, cursor.row, columns)?;
        if !self.classifier.is_input_prompt(&current) {
            // Command still producing output
            return Ok(None);
        }

        let region = surface.text_range(state.last_logged_row, 0, cursor.row, columns)?;
        let chunk = self.classifier.filter_chunk(&region, &mut state.filter);
        state.last_logged_row = cursor.row;
        Ok(chunk)
    }

    /// First-invocation capture of the whole buffer, so output that was on
    /// screen before logging started is recorded once.
    pub fn snapshot(
        &self,
        surface: &dyn TerminalSurface,
        state: &mut BoundaryState,
    ) -> Result<Option<String>, HostError> {
        let text = buffer_text(surface)?;
        Ok(self.classifier.filter_chunk(&text, &mut state.filter))
    }
}

/// The whole buffer, row 0 to the last row, at full width.
pub fn buffer_text(surface: &dyn TerminalSurface) -> Result<String, HostError> {
    let rows = surface.row_count()?;
    if rows == 0 {
        return Ok(String::new());
    }
    let columns = surface.column_count()?;
    surface.text_range(0, 0, rows - 1, columns)
}
