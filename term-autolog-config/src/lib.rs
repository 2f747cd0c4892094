//! Configuration system for term-autolog.
//!
//! This crate provides configuration loading, saving, and default values
//! for the session logger. It includes:
//!
//! - The top-level [`Config`] and its YAML persistence
//! - External sanitizer settings ([`SanitizerConfig`])
//! - The prompt heuristic marker set ([`PromptConfig`])
//! - Typed load/save errors ([`ConfigError`])

pub mod config;
pub mod defaults;
pub mod error;
mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::ConfigError;
pub use types::{LogLevel, PromptConfig, SanitizerConfig};
