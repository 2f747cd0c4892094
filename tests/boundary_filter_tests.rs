//! Command boundary detection against scripted in-memory terminals.

mod common;

use common::{KALI_HEADER, KALI_INPUT};
use term_autolog::boundary::{BoundaryState, CommandBoundaryFilter, FilterState, LineClassifier};
use term_autolog::config::PromptConfig;
use term_autolog::surface::TerminalSurface;
use term_autolog::surface::memory::MemorySurface;

fn filter() -> CommandBoundaryFilter {
    CommandBoundaryFilter::new(LineClassifier::new(&PromptConfig::default()).unwrap())
}

/// Surface with an idle prompt on row 0 and a state anchored there.
fn idle() -> (MemorySurface, BoundaryState) {
    let surface = MemorySurface::new("s", 120);
    surface.set_row(0, KALI_INPUT);
    surface.set_cursor(4, 0);
    (surface, BoundaryState::starting_at(0))
}

#[test]
fn test_no_flush_until_cursor_moves_to_new_row() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("ls");
    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
    assert_eq!(state.last_logged_row, 0);
}

#[test]
fn test_no_flush_while_command_still_printing() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("make");
    surface.print_lines(&["compiling a", "compiling b"]);
    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
    assert_eq!(state.last_logged_row, 0);

    surface.print_lines(&["done", KALI_HEADER, KALI_INPUT]);
    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(
        chunk.as_deref(),
        Some("└─# make\ncompiling a\ncompiling b\ndone\n┌──(root㉿kali)-[~]\n")
    );
    assert_eq!(state.last_logged_row, 5);
}

#[test]
fn test_header_line_at_cursor_does_not_flush() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("pwd");
    surface.print_lines(&["/root", KALI_HEADER]);
    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
}

#[test]
fn test_row_advances_even_when_nothing_is_kept() {
    let f = filter();
    let (surface, mut state) = idle();
    // Enter on an empty prompt
    surface.print_lines(&[KALI_INPUT]);
    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
    assert_eq!(state.last_logged_row, 1);
}

#[test]
fn test_last_logged_row_never_decreases() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("ls");
    surface.print_lines(&["a.txt", KALI_INPUT]);
    f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(state.last_logged_row, 2);

    // Screen cleared: cursor jumps back to the top
    surface.set_cursor(4, 0);
    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
    assert_eq!(state.last_logged_row, 2);
}

#[test]
fn test_consecutive_commands_are_separate_chunks() {
    let f = filter();
    let (surface, mut state) = idle();

    surface.type_text("whoami");
    surface.print_lines(&["root", KALI_HEADER, KALI_INPUT]);
    let first = f.on_contents_changed(&surface, &mut state).unwrap();

    surface.type_text("id -u");
    surface.print_lines(&["0", KALI_HEADER, KALI_INPUT]);
    let second = f.on_contents_changed(&surface, &mut state).unwrap();

    assert_eq!(first.as_deref(), Some("└─# whoami\nroot\n┌──(root㉿kali)-[~]\n"));
    // The prompt row that ended the first chunk starts the second
    assert_eq!(second.as_deref(), Some("└─# id -u\n0\n┌──(root㉿kali)-[~]\n"));
}

#[test]
fn test_excluded_command_output_is_skipped_until_next_prompt() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("context wipe");
    surface.print_lines(&["wiping 3 entries", "api_key=abc123", KALI_HEADER, KALI_INPUT]);

    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(chunk.as_deref(), Some("┌──(root㉿kali)-[~]\n"));
    assert_eq!(state.filter, FilterState::Scanning);
}

#[test]
fn test_comment_and_shell_example_lines_stay_inside_excluded_output() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("context show");
    surface.print_lines(&[
        "session notes",
        "# API keys",
        "AWS_SECRET=abc123",
        "$ cargo build",
        "DB_PASSWORD=hunter2",
        KALI_HEADER,
        KALI_INPUT,
    ]);

    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(chunk.as_deref(), Some("┌──(root㉿kali)-[~]\n"));
    assert_eq!(state.filter, FilterState::Scanning);
}

#[test]
fn test_comment_line_at_cursor_does_not_flush() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("cat notes.md");
    surface.print_lines(&["intro", "# Setup"]);

    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
    assert_eq!(state.last_logged_row, 0);
}

#[test]
fn test_skip_state_survives_between_notifications() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("ls");
    // The next command was already typed when the notification arrived
    surface.print_lines(&["a.txt", "└─# context dump"]);

    let first = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(first.as_deref(), Some("└─# ls\na.txt\n"));
    assert_eq!(state.filter, FilterState::SkippingContext);
    assert_eq!(state.last_logged_row, 2);

    surface.print_lines(&["token=xyz", KALI_HEADER, KALI_INPUT]);
    let second = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(second.as_deref(), Some("┌──(root㉿kali)-[~]\n"));
    assert_eq!(state.filter, FilterState::Scanning);
}

#[test]
fn test_separator_style_prompts() {
    let f = filter();
    let surface = MemorySurface::new("s", 120);
    surface.set_row(0, "user@host:~$ ");
    surface.set_cursor(13, 0);
    let mut state = BoundaryState::starting_at(0);

    surface.type_text("uname -s");
    surface.print_lines(&["Linux", "user@host:~$ "]);
    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(chunk.as_deref(), Some("user@host:~$ uname -s\nLinux\n"));
}

#[test]
fn test_failed_exit_status_prompt_is_empty() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("false");
    surface.print_lines(&["└─#   1 ⨯"]);
    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(chunk.as_deref(), Some("└─# false\n"));
}

#[test]
fn test_partial_keystrokes_are_dropped() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("cat notes.txt");
    surface.print_lines(&["l", "buy milk", "x_", KALI_INPUT]);
    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(chunk.as_deref(), Some("└─# cat notes.txt\nbuy milk\n"));
}

#[test]
fn test_host_failure_leaves_state_untouched() {
    let f = filter();
    let (surface, mut state) = idle();
    surface.type_text("ls");
    surface.print_lines(&["a.txt", KALI_INPUT]);
    surface.set_unavailable(true);

    assert!(f.on_contents_changed(&surface, &mut state).is_err());
    assert_eq!(state.last_logged_row, 0);

    surface.set_unavailable(false);
    let chunk = f.on_contents_changed(&surface, &mut state).unwrap();
    assert_eq!(chunk.as_deref(), Some("└─# ls\na.txt\n"));
}

#[test]
fn test_snapshot_captures_existing_buffer_once() {
    let f = filter();
    let surface = MemorySurface::from_transcript(
        "s",
        "=== Terminal session started at 2025-01-01 09:00:00 ===\n\
         ┌──(root㉿kali)-[~]\n\
         └─# id\n\
         uid=0(root) gid=0(root)\n\
         \n\
         ┌──(root㉿kali)-[~]\n\
         └─# \n",
    );
    let cursor = surface.cursor_position().unwrap();
    let mut state = BoundaryState::starting_at(cursor.row);

    let chunk = f.snapshot(&surface, &mut state).unwrap();
    assert_eq!(
        chunk.as_deref(),
        Some(
            "┌──(root㉿kali)-[~]\n└─# id\nuid=0(root) gid=0(root)\n┌──(root㉿kali)-[~]\n"
        )
    );
    // Snapshot does not move the baseline; nothing new to flush
    assert_eq!(state.last_logged_row, cursor.row);
    assert_eq!(f.on_contents_changed(&surface, &mut state).unwrap(), None);
}

#[test]
fn test_snapshot_of_idle_prompt_is_empty() {
    let f = filter();
    let (surface, mut state) = idle();
    assert_eq!(f.snapshot(&surface, &mut state).unwrap(), None);
}
