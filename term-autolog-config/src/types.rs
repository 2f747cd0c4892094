use serde::{Deserialize, Serialize};

/// Log level for the diagnostic log file.
///
/// Environment variable `RUST_LOG` and the `--log-level` CLI flag take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    Off,
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Most verbose
    Trace,
}

impl LogLevel {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "unknown log level '{other}' (expected off, error, warn, info, debug, trace)"
            )),
        }
    }
}

/// External redaction process settings.
///
/// The process is invoked as `command args... output_flag <path>` with the
/// raw chunk on stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// When false, nothing is queued for sanitization
    #[serde(default = "crate::defaults::bool_true")]
    pub enabled: bool,

    /// Program to execute
    #[serde(default = "crate::defaults::sanitizer_command")]
    pub command: String,

    /// Leading arguments, before the output option
    #[serde(default = "crate::defaults::sanitizer_args")]
    pub args: Vec<String>,

    /// Option that carries the destination path
    #[serde(default = "crate::defaults::sanitizer_output_flag")]
    pub output_flag: String,

    /// Hard limit on a single invocation
    #[serde(default = "crate::defaults::sanitizer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: crate::defaults::sanitizer_command(),
            args: crate::defaults::sanitizer_args(),
            output_flag: crate::defaults::sanitizer_output_flag(),
            timeout_secs: crate::defaults::sanitizer_timeout_secs(),
        }
    }
}

/// Visual markers used to recognise prompt lines.
///
/// This is a heuristic set tuned to one prompt theme, not a shell grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Prefixes of the first line of a multi-line prompt (never input-ready)
    #[serde(default = "crate::defaults::header_prefixes")]
    pub header_prefixes: Vec<String>,

    /// Prefixes of an input-ready prompt line; the command follows the prefix
    #[serde(default = "crate::defaults::input_prefixes")]
    pub input_prefixes: Vec<String>,

    /// Separators of `user@host:~$ command` style prompts
    #[serde(default = "crate::defaults::input_separators")]
    pub input_separators: Vec<String>,

    /// Commands whose invocation and output are never logged
    #[serde(default = "crate::defaults::excluded_commands")]
    pub excluded_commands: Vec<String>,

    /// Lines starting with this marker are internal banners and are dropped
    #[serde(default = "crate::defaults::session_marker")]
    pub session_marker: String,

    /// Suffixes that indicate input captured mid-keystroke
    #[serde(default = "crate::defaults::continuation_markers")]
    pub continuation_markers: Vec<String>,

    /// Glyphs a prompt shows next to a failed command's exit status
    #[serde(default = "crate::defaults::failure_glyphs")]
    pub failure_glyphs: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            header_prefixes: crate::defaults::header_prefixes(),
            input_prefixes: crate::defaults::input_prefixes(),
            input_separators: crate::defaults::input_separators(),
            excluded_commands: crate::defaults::excluded_commands(),
            session_marker: crate::defaults::session_marker(),
            continuation_markers: crate::defaults::continuation_markers(),
            failure_glyphs: crate::defaults::failure_glyphs(),
        }
    }
}
