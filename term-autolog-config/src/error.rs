//! Typed error variants for the term-autolog-config crate.
//!
//! Callers that want to distinguish a missing/unreadable file from a bad
//! YAML document or an invalid value can match on [`ConfigError`].

use thiserror::Error;

/// Errors that can occur when loading, validating, or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing the config file.
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file contained invalid YAML that could not be parsed.
    #[error("YAML parse error in config: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string names the field and why it is invalid.
    #[error("Config validation error: {0}")]
    Validation(String),
}
