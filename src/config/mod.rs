//! Configuration module - palette settings and user preferences
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.command-palette/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, HotkeyConfig, etc.)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{DEFAULT_CONFIG_PATH, DEFAULT_FALLBACK_TEXT, DEFAULT_REMOTE_TIMEOUT_MS};

pub use types::{Config, HotkeyConfig, QuickPromptConfig, RemoteDefaults};

pub use loader::{load_config, load_config_from, parse_config};

#[cfg(test)]
pub use defaults::{
    DEFAULT_COPY_ON_INSERT_FAILURE, DEFAULT_EMPTY_STATE, DEFAULT_KEEP_OPEN_AFTER_INSERT,
    DEFAULT_PLACEHOLDER, DEFAULT_QUICK_PROMPT_TITLE, DEFAULT_RESTORE_LAST_QUERY,
};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
