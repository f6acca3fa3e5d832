//! Configuration type definitions
//!
//! This module contains all the struct and enum definitions for configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::defaults::*;
use crate::palette::keys::{Shortcut, ShortcutParseError};
use crate::surface::InsertMode;

// ============================================
// HOTKEY CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        HotkeyConfig {
            modifiers: DEFAULT_TOGGLE_MODIFIERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            key: DEFAULT_TOGGLE_KEY.to_string(),
        }
    }
}

impl HotkeyConfig {
    /// Convert to canonical shortcut string format (e.g., "ctrl+slash").
    ///
    /// Keys are normalized:
    /// - "KeyX" -> "x" (strip Key prefix, lowercase)
    /// - "Digit0" -> "0" (strip Digit prefix)
    /// - Other keys kept as-is but lowercased
    pub fn to_shortcut_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        // Consistent order: alt, cmd, ctrl, shift
        let has_alt = self.modifiers.iter().any(|m| m == "alt" || m == "option");
        let has_cmd = self.modifiers.iter().any(|m| m == "meta" || m == "cmd");
        let has_ctrl = self.modifiers.iter().any(|m| m == "ctrl" || m == "control");
        let has_shift = self.modifiers.iter().any(|m| m == "shift");

        if has_alt {
            parts.push("alt".to_string());
        }
        if has_cmd {
            parts.push("cmd".to_string());
        }
        if has_ctrl {
            parts.push("ctrl".to_string());
        }
        if has_shift {
            parts.push("shift".to_string());
        }

        let key = if let Some(rest) = self.key.strip_prefix("Key") {
            rest.to_lowercase()
        } else if let Some(rest) = self.key.strip_prefix("Digit") {
            rest.to_string()
        } else {
            self.key.to_lowercase()
        };
        parts.push(key);

        parts.join("+")
    }

    /// Parse into a matchable [`Shortcut`].
    pub fn to_shortcut(&self) -> Result<Shortcut, ShortcutParseError> {
        Shortcut::parse(&self.to_shortcut_string())
    }
}

// ============================================
// REMOTE DEFAULTS
// ============================================

/// Defaults applied to remote-call commands that don't set their own values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDefaults {
    /// Abort deadline for request + stream, in milliseconds (default: 15000)
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
    /// Text substituted when a call fails before producing output
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
    /// Extra headers sent with every remote call (e.g. auth tokens)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

fn default_remote_timeout_ms() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_MS
}
fn default_fallback_text() -> String {
    DEFAULT_FALLBACK_TEXT.to_string()
}

impl Default for RemoteDefaults {
    fn default() -> Self {
        RemoteDefaults {
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
            fallback_text: default_fallback_text(),
            headers: HashMap::new(),
        }
    }
}

// ============================================
// QUICK PROMPT
// ============================================

/// Remote call used when free text is submitted without selecting a command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickPromptConfig {
    pub endpoint: String,
    /// Prompt template; `{{query}}` is replaced by the submitted text
    #[serde(default = "default_quick_prompt_template")]
    pub prompt_template: String,
    #[serde(default = "default_quick_prompt_title")]
    pub title: String,
}

fn default_quick_prompt_template() -> String {
    DEFAULT_QUICK_PROMPT_TEMPLATE.to_string()
}
fn default_quick_prompt_title() -> String {
    DEFAULT_QUICK_PROMPT_TITLE.to_string()
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Global toggle shortcut (default: Ctrl+/)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<HotkeyConfig>,
    /// Set to false to disable the global toggle shortcut entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey_enabled: Option<bool>,
    /// Restore the last query when reopening instead of clearing it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_last_query: Option<bool>,
    /// Keep the palette open after a successful insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_open_after_insert: Option<bool>,
    /// Copy content to the clipboard when insertion fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_on_insert_failure: Option<bool>,
    /// Where inserted content lands relative to the caret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_mode: Option<InsertMode>,
    /// Render preview text to markup before inserting into rich regions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_as_html: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteDefaults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_prompt: Option<QuickPromptConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_state: Option<String>,
}

impl Config {
    /// Returns the toggle shortcut, or None when disabled
    pub fn get_hotkey(&self) -> Option<HotkeyConfig> {
        if !self.hotkey_enabled.unwrap_or(true) {
            return None;
        }
        Some(self.hotkey.clone().unwrap_or_default())
    }

    pub fn get_restore_last_query(&self) -> bool {
        self.restore_last_query
            .unwrap_or(DEFAULT_RESTORE_LAST_QUERY)
    }

    pub fn get_keep_open_after_insert(&self) -> bool {
        self.keep_open_after_insert
            .unwrap_or(DEFAULT_KEEP_OPEN_AFTER_INSERT)
    }

    pub fn get_copy_on_insert_failure(&self) -> bool {
        self.copy_on_insert_failure
            .unwrap_or(DEFAULT_COPY_ON_INSERT_FAILURE)
    }

    pub fn get_insert_mode(&self) -> InsertMode {
        self.insert_mode.unwrap_or_default()
    }

    pub fn get_insert_as_html(&self) -> bool {
        self.insert_as_html.unwrap_or(DEFAULT_INSERT_AS_HTML)
    }

    /// Returns the remote defaults, or built-in defaults if not configured
    pub fn get_remote(&self) -> RemoteDefaults {
        self.remote.clone().unwrap_or_default()
    }

    pub fn get_placeholder(&self) -> String {
        self.placeholder
            .clone()
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string())
    }

    pub fn get_empty_state(&self) -> String {
        self.empty_state
            .clone()
            .unwrap_or_else(|| DEFAULT_EMPTY_STATE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkey_config_to_shortcut_string_basic() {
        let config = HotkeyConfig {
            modifiers: vec!["meta".to_string()],
            key: "KeyK".to_string(),
        };
        assert_eq!(config.to_shortcut_string(), "cmd+k");
    }

    #[test]
    fn hotkey_config_to_shortcut_string_multiple_modifiers() {
        let config = HotkeyConfig {
            modifiers: vec!["ctrl".to_string(), "shift".to_string()],
            key: "Slash".to_string(),
        };
        assert_eq!(config.to_shortcut_string(), "ctrl+shift+slash");
    }

    #[test]
    fn hotkey_config_to_shortcut_string_digit_key() {
        let config = HotkeyConfig {
            modifiers: vec!["alt".to_string()],
            key: "Digit0".to_string(),
        };
        assert_eq!(config.to_shortcut_string(), "alt+0");
    }

    #[test]
    fn default_hotkey_parses_to_ctrl_slash() {
        let shortcut = HotkeyConfig::default().to_shortcut().unwrap();
        assert_eq!(shortcut.key, "slash");
        assert!(shortcut.modifiers.ctrl);
        assert!(!shortcut.modifiers.cmd);
    }

    #[test]
    fn literal_slash_key_parses() {
        let config = HotkeyConfig {
            modifiers: vec!["meta".to_string()],
            key: "/".to_string(),
        };
        let shortcut = config.to_shortcut().unwrap();
        assert_eq!(shortcut.key, "slash");
        assert!(shortcut.modifiers.cmd);
    }
}
