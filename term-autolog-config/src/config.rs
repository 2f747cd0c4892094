//! Core `Config` struct and its persistence.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - XDG-compliant path helpers (`config_path`, `config_dir`)
//! - `logs_dir` resolution with `~/` expansion
//! - `validate` for values the pipeline cannot run with

use crate::error::ConfigError;
use crate::types::{LogLevel, PromptConfig, SanitizerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the session logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // ========================================================================
    // Log files
    // ========================================================================
    /// Directory holding `<id>_original.log` and `<id>.log` per terminal
    #[serde(default = "crate::defaults::log_directory")]
    pub log_directory: String,

    // ========================================================================
    // Pipeline tuning
    // ========================================================================
    /// Interval between surface enumerations, in milliseconds
    #[serde(default = "crate::defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capacity of each bounded work queue
    #[serde(default = "crate::defaults::queue_capacity")]
    pub queue_capacity: usize,

    /// How long a producer waits on a full queue before dropping the item
    #[serde(default = "crate::defaults::enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,

    /// Bounded wait for each worker thread at shutdown
    #[serde(default = "crate::defaults::shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    // ========================================================================
    // Debug Logging
    // ========================================================================
    /// Verbosity of the diagnostic log file
    #[serde(default)]
    pub log_level: LogLevel,

    // ========================================================================
    // Host adapter
    // ========================================================================
    /// tmux binary used by the production host adapter
    #[serde(default = "crate::defaults::tmux_path")]
    pub tmux_path: String,

    // ========================================================================
    // Sanitizer and prompt heuristics
    // ========================================================================
    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_directory: crate::defaults::log_directory(),
            poll_interval_ms: crate::defaults::poll_interval_ms(),
            queue_capacity: crate::defaults::queue_capacity(),
            enqueue_timeout_ms: crate::defaults::enqueue_timeout_ms(),
            shutdown_timeout_ms: crate::defaults::shutdown_timeout_ms(),
            log_level: LogLevel::default(),
            tmux_path: crate::defaults::tmux_path(),
            sanitizer: SanitizerConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it with defaults
    /// when it does not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            log::info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            if let Err(e) = config.save() {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory: `~/.config/term-autolog`
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("term-autolog")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("term-autolog")
            } else {
                // Fallback if home directory cannot be determined
                PathBuf::from(".")
            }
        }
    }

    /// Resolve the log directory, expanding a leading `~/`.
    ///
    /// Does not create the directory; the raw writer creates parents lazily.
    pub fn logs_dir(&self) -> PathBuf {
        if let Some(rest) = self.log_directory.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(&self.log_directory)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn sanitizer_timeout(&self) -> Duration {
        Duration::from_secs(self.sanitizer.timeout_secs)
    }

    /// Reject values the logging pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_directory.trim().is_empty() {
            return Err(ConfigError::Validation(
                "log_directory must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.sanitizer.enabled && self.sanitizer.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sanitizer.command must be set when the sanitizer is enabled".to_string(),
            ));
        }
        if self.sanitizer.enabled && self.sanitizer.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "sanitizer.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let prompt = &self.prompt;
        if prompt.input_prefixes.iter().all(|p| p.trim().is_empty())
            && prompt.input_separators.iter().all(|s| s.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "prompt needs at least one input prefix or separator".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.sanitizer.timeout_secs, 30);
        assert_eq!(config.prompt.excluded_commands, vec!["context".to_string()]);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "queue_capacity: 8\nsanitizer:\n  enabled: false\n";
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.queue_capacity, 8);
        assert!(!config.sanitizer.enabled);
        assert_eq!(config.sanitizer.output_flag, "-o");
        assert_eq!(config.prompt, PromptConfig::default());
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.log_directory = "/var/tmp/autolog".to_string();
        config.log_level = LogLevel::Debug;
        config.save_to(&path).unwrap();

        assert!(!path.with_extension("yaml.tmp").exists());
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = Config {
            queue_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("queue_capacity")
        ));
    }

    #[test]
    fn test_validation_rejects_markerless_prompt() {
        let mut config = Config::default();
        config.prompt.input_prefixes.clear();
        config.prompt.input_separators = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_sanitizer_may_have_no_command() {
        let mut config = Config::default();
        config.sanitizer.enabled = false;
        config.sanitizer.command.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "queue_capacity: [not a number").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_logs_dir_expands_home() {
        let config = Config {
            log_directory: "~/autolog".to_string(),
            ..Config::default()
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.logs_dir(), home.join("autolog"));
        }
    }
}
