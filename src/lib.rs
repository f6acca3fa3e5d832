//! Command Palette - an in-page command palette for editable surfaces
//!
//! The palette lists a catalog of commands, filters it as the user types, and
//! runs the selected one: a static snippet, a remote call whose streamed
//! response fills a preview, or a utility effect. Preview text is inserted
//! back into whichever editable surface had focus when the palette opened.
//!
//! - [`catalog`] - command model, JSON binding and the search index
//! - [`search`] - subsequence matching and query filtering
//! - [`ingest`] - turning response bytes into text deltas
//! - [`remote`] - the remote-call client seam and request assembly
//! - [`surface`] - target surfaces and insertion
//! - [`palette`] - the state machine that ties it together

pub mod catalog;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod palette;
pub mod remote;
pub mod search;
pub mod surface;

pub use catalog::{Command, CommandAction, Group};
pub use config::Config;
pub use error::PaletteError;
pub use palette::{Palette, PaletteEvent, PaletteView};
