//! Default values referenced by `#[serde(default = "...")]` attributes.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Logging pipeline ───────────────────────────────────────────────────────

pub fn log_directory() -> String {
    std::env::temp_dir()
        .join("terminal_logs")
        .to_string_lossy()
        .to_string()
}

pub fn poll_interval_ms() -> u64 {
    500
}

pub fn queue_capacity() -> usize {
    1000
}

pub fn enqueue_timeout_ms() -> u64 {
    100
}

pub fn shutdown_timeout_ms() -> u64 {
    2000
}

pub fn tmux_path() -> String {
    "tmux".to_string()
}

// ── Sanitizer ──────────────────────────────────────────────────────────────

pub fn sanitizer_command() -> String {
    "/opt/presidio-secrets-sanitizer/venv/bin/python3".to_string()
}

pub fn sanitizer_args() -> Vec<String> {
    vec![
        "/opt/presidio-secrets-sanitizer/sanitizer.py".to_string(),
        "--stdin".to_string(),
    ]
}

pub fn sanitizer_output_flag() -> String {
    "-o".to_string()
}

pub fn sanitizer_timeout_secs() -> u64 {
    30
}

// ── Prompt heuristics ──────────────────────────────────────────────────────
//
// The glyphs below match the two-line Kali-style prompt
// (`┌──(user㉿host)-[~]` / `└─# `) plus plain `user@host:~$ ` prompts.
// Other shell themes need their own markers in config.yaml.

pub fn header_prefixes() -> Vec<String> {
    vec!["┌──".to_string()]
}

pub fn input_prefixes() -> Vec<String> {
    vec!["└─#".to_string(), "└─$".to_string()]
}

pub fn input_separators() -> Vec<String> {
    vec!["$ ".to_string(), "# ".to_string()]
}

pub fn excluded_commands() -> Vec<String> {
    vec!["context".to_string()]
}

pub fn session_marker() -> String {
    "===".to_string()
}

pub fn continuation_markers() -> Vec<String> {
    vec!["_".to_string(), "|".to_string()]
}

pub fn failure_glyphs() -> String {
    "⨯✗×✘❌".to_string()
}
