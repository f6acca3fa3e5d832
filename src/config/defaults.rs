//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Where the palette looks for its config file
pub const DEFAULT_CONFIG_PATH: &str = "~/.command-palette/config.json";

/// Default toggle shortcut (Ctrl+/)
pub const DEFAULT_TOGGLE_KEY: &str = "Slash";
pub const DEFAULT_TOGGLE_MODIFIERS: &[&str] = &["ctrl"];

/// Whether reopening the palette restores the previous query
pub const DEFAULT_RESTORE_LAST_QUERY: bool = false;

/// Whether the palette stays open after a successful insert
pub const DEFAULT_KEEP_OPEN_AFTER_INSERT: bool = false;

/// Whether a failed insert copies the content to the clipboard
pub const DEFAULT_COPY_ON_INSERT_FAILURE: bool = true;

/// Whether inserted content is rendered to markup first
pub const DEFAULT_INSERT_AS_HTML: bool = false;

/// Remote call timeout (abort deadline for request + stream)
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 15_000;

/// Response shown when a remote call fails before producing anything
pub const DEFAULT_FALLBACK_TEXT: &str = "Hi there! Thanks so much for your patience while we looked into this. \
I re-checked everything on our side and it is ready to go.\n\n\
If the issue comes back, grab a screenshot and let us know so we can jump back in immediately.";

/// Quick prompt defaults (free text submitted without selecting a command)
pub const DEFAULT_QUICK_PROMPT_TEMPLATE: &str = "{{query}}";
pub const DEFAULT_QUICK_PROMPT_TITLE: &str = "Quick prompt";

/// Input placeholder and empty list message
pub const DEFAULT_PLACEHOLDER: &str = "Type to search…";
pub const DEFAULT_EMPTY_STATE: &str = "No results found.";
