//! Configuration loading from file system

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::DEFAULT_CONFIG_PATH;
use super::types::Config;
use crate::error::PaletteError;

/// Load configuration from ~/.command-palette/config.json
///
/// Returns Config::default() if the file is missing or invalid.
pub fn load_config() -> Config {
    let config_path = PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref());
    load_config_from(&config_path)
}

/// Load configuration from an explicit path.
///
/// Never fails: a missing file, an unreadable file or malformed JSON all log
/// and fall back to defaults so the palette always comes up.
#[instrument(name = "load_config")]
pub fn load_config_from(config_path: &Path) -> Config {
    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return Config::default();
    }

    let contents = match std::fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Failed to read config, using defaults");
            return Config::default();
        }
    };

    match parse_config(&contents) {
        Ok(config) => {
            info!(path = %config_path.display(), "Successfully loaded config");
            config
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}

/// Parse config JSON, with a hint for common config mistakes in the error.
pub fn parse_config(contents: &str) -> Result<Config, PaletteError> {
    serde_json::from_str::<Config>(contents).map_err(|e| {
        let message = e.to_string();
        let error_hint = if message.contains("missing field `modifiers`")
            || message.contains("missing field `key`")
        {
            "\n\nHint: 'hotkey' requires 'modifiers' (array) and 'key' (string). Example:\n\
            \"hotkey\": { \"modifiers\": [\"ctrl\"], \"key\": \"Slash\" }"
        } else if message.contains("missing field `endpoint`") {
            "\n\nHint: 'quickPrompt' requires an 'endpoint' URL."
        } else {
            ""
        };
        PaletteError::Config(format!("{}{}", message, error_hint))
    })
}
