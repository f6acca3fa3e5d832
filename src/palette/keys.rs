//! Keyboard shortcuts and key input.
//!
//! - `Shortcut` - a toggle shortcut (modifiers + key) parsed from config
//! - `Modifiers` - modifier key flags (cmd, ctrl, alt, shift)
//! - `KeyInput` - one key press delivered to the palette, tagged with where it
//!   came from

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing a shortcut string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("shortcut string is empty")]
    Empty,
    #[error("shortcut has no key, only modifiers")]
    MissingKey,
    #[error("unknown token '{0}' in shortcut")]
    UnknownToken(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Modifier keys held during a key press.
///
/// `cmd` is the platform meta key (Command on macOS, Super/Windows elsewhere).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub cmd: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Modifiers {
    pub fn cmd() -> Self {
        Self {
            cmd: true,
            ..Default::default()
        }
    }
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Default::default()
        }
    }
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Default::default()
        }
    }
    pub fn any(&self) -> bool {
        self.cmd || self.ctrl || self.alt || self.shift
    }
    /// Cmd or Ctrl, the "submit anyway" chord for Enter
    pub fn accelerator(&self) -> bool {
        self.cmd || self.ctrl
    }
}

/// A keyboard shortcut consisting of modifier keys and a main key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shortcut {
    pub key: String,
    pub modifiers: Modifiers,
}

impl Shortcut {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: canonicalize_key(&key.into()),
            modifiers,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ShortcutParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        // "ctrl++" style shortcuts aren't supported; '+' is always a separator
        let normalized = s.replace('+', " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key_part: Option<&str> = None;

        for part in &parts {
            match part.to_lowercase().as_str() {
                "cmd" | "command" | "meta" | "super" | "win" | "⌘" => modifiers.cmd = true,
                "ctrl" | "control" | "ctl" | "^" => modifiers.ctrl = true,
                "alt" | "opt" | "option" | "⌥" => modifiers.alt = true,
                "shift" | "shft" | "⇧" => modifiers.shift = true,
                _ => {
                    if key_part.is_some() {
                        return Err(ShortcutParseError::UnknownToken(part.to_string()));
                    }
                    key_part = Some(part);
                }
            }
        }

        let key = key_part.ok_or(ShortcutParseError::MissingKey)?;
        let canonical_key = canonicalize_key(key);
        if !is_known_key(&canonical_key) {
            return Err(ShortcutParseError::UnknownKey(key.to_string()));
        }

        Ok(Self {
            key: canonical_key,
            modifiers,
        })
    }

    /// Exact modifier match. A slash shortcut also accepts `?`, which is what
    /// some layouts report for the same physical key.
    pub fn matches(&self, input: &KeyInput) -> bool {
        let key_ok = input.key == self.key || (self.key == "slash" && input.key == "question");
        key_ok && input.modifiers == self.modifiers
    }

    pub fn to_canonical_string(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.modifiers.alt {
            parts.push("alt");
        }
        if self.modifiers.cmd {
            parts.push("cmd");
        }
        if self.modifiers.ctrl {
            parts.push("ctrl");
        }
        if self.modifiers.shift {
            parts.push("shift");
        }
        parts.push(&self.key);
        parts.join("+")
    }

    fn key_display_text(&self) -> String {
        match self.key.as_str() {
            "slash" => "/",
            "enter" => "Enter",
            "escape" => "Esc",
            "space" => "Space",
            "period" => ".",
            "comma" => ",",
            k => return k.to_uppercase(),
        }
        .to_string()
    }
}

impl fmt::Display for Shortcut {
    /// "Ctrl + /" style, as shown next to commands
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.alt {
            parts.push("Alt".to_string());
        }
        if self.modifiers.shift {
            parts.push("Shift".to_string());
        }
        if self.modifiers.cmd {
            parts.push("Meta".to_string());
        }
        parts.push(self.key_display_text());
        write!(f, "{}", parts.join(" + "))
    }
}

/// Canonicalize a key name to the internal standard form.
pub fn canonicalize_key(key: &str) -> String {
    let key_lower = key.to_lowercase();
    match key_lower.as_str() {
        "arrowup" | "uparrow" => "up",
        "arrowdown" | "downarrow" => "down",
        "arrowleft" | "leftarrow" => "left",
        "arrowright" | "rightarrow" => "right",
        "return" => "enter",
        "esc" => "escape",
        "back" => "backspace",
        "del" => "delete",
        "/" | "forwardslash" => "slash",
        "?" => "question",
        "\\" => "backslash",
        ";" => "semicolon",
        "'" | "apostrophe" => "quote",
        "," => "comma",
        "." | "dot" => "period",
        "[" | "leftbracket" => "bracketleft",
        "]" | "rightbracket" => "bracketright",
        "-" | "dash" | "hyphen" => "minus",
        "=" | "equals" => "equal",
        "`" | "backtick" | "grave" => "backquote",
        " " | "spacebar" => "space",
        _ => return key_lower,
    }
    .to_string()
}

/// Check if a key name is known/valid.
pub fn is_known_key(key: &str) -> bool {
    let single_alnum = key.len() == 1 && key.chars().all(|c| c.is_ascii_alphanumeric());
    let function_key = key
        .strip_prefix('f')
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| (1..=24).contains(&n));

    single_alnum
        || function_key
        || matches!(
            key,
            "space"
                | "enter"
                | "tab"
                | "escape"
                | "backspace"
                | "delete"
                | "up"
                | "down"
                | "left"
                | "right"
                | "home"
                | "end"
                | "pageup"
                | "pagedown"
                | "semicolon"
                | "quote"
                | "comma"
                | "period"
                | "slash"
                | "question"
                | "backslash"
                | "bracketleft"
                | "bracketright"
                | "minus"
                | "equal"
                | "backquote"
        )
}

/// Where a key press originated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Anywhere on the host page
    #[default]
    Page,
    /// The palette's own input or list
    Palette,
}

/// One key press delivered to the palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// Canonical key name (see [`canonicalize_key`])
    pub key: String,
    pub modifiers: Modifiers,
    pub origin: KeyOrigin,
    /// Pressed while an input-method composition is active
    pub composing: bool,
}

impl KeyInput {
    pub fn new(key: &str) -> Self {
        Self {
            key: canonicalize_key(key),
            modifiers: Modifiers::default(),
            origin: KeyOrigin::Page,
            composing: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn from_palette(mut self) -> Self {
        self.origin = KeyOrigin::Palette;
        self
    }

    pub fn composing(mut self) -> Self {
        self.composing = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_aliases() {
        let shortcut = Shortcut::parse("Control + /").unwrap();
        assert_eq!(shortcut.key, "slash");
        assert!(shortcut.modifiers.ctrl);
        assert_eq!(shortcut.to_canonical_string(), "ctrl+slash");

        let shortcut = Shortcut::parse("meta+shift+K").unwrap();
        assert_eq!(shortcut.to_canonical_string(), "cmd+shift+k");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Shortcut::parse("  "), Err(ShortcutParseError::Empty));
        assert_eq!(Shortcut::parse("ctrl+shift"), Err(ShortcutParseError::MissingKey));
        assert_eq!(
            Shortcut::parse("ctrl+a+b"),
            Err(ShortcutParseError::UnknownToken("b".to_string()))
        );
        assert_eq!(
            Shortcut::parse("ctrl+banana"),
            Err(ShortcutParseError::UnknownKey("banana".to_string()))
        );
    }

    #[test]
    fn function_keys_are_known() {
        assert!(is_known_key("f1"));
        assert!(is_known_key("f24"));
        assert!(!is_known_key("f25"));
        assert!(!is_known_key("f"));
    }

    #[test]
    fn slash_shortcut_accepts_question_mark() {
        let shortcut = Shortcut::new("/", Modifiers::ctrl());
        assert!(shortcut.matches(&KeyInput::new("/").with_modifiers(Modifiers::ctrl())));
        assert!(shortcut.matches(&KeyInput::new("?").with_modifiers(Modifiers::ctrl())));
        assert!(!shortcut.matches(&KeyInput::new("/")));
        assert!(!shortcut.matches(&KeyInput::new("/").with_modifiers(Modifiers::cmd())));
    }

    #[test]
    fn key_input_canonicalizes() {
        assert_eq!(KeyInput::new("ArrowDown").key, "down");
        assert_eq!(KeyInput::new("Esc").key, "escape");
        assert_eq!(KeyInput::new("Enter").from_palette().origin, KeyOrigin::Palette);
    }

    #[test]
    fn display_reads_naturally() {
        assert_eq!(Shortcut::new("/", Modifiers::ctrl()).to_string(), "Ctrl + /");
    }
}
