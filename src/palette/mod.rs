//! The in-page command palette
//!
//! - `state` - [`PaletteState`] and its selection invariant
//! - `keys` - shortcut parsing and key input
//! - `preview` - the response buffer with follow-the-bottom scrolling
//! - `events` - lifecycle notifications
//! - `effects` - utility command effects
//! - `view` - render snapshots
//! - `machine` - [`Palette`], which drives everything above

mod effects;
mod events;
pub mod keys;
mod machine;
mod preview;
mod state;
mod view;

pub use effects::{EffectContext, EffectRegistry, COPY_TEXT, OPEN_URL};
pub use events::{PaletteEvent, SubmitVia};
pub use keys::{KeyInput, KeyOrigin, Modifiers, Shortcut};
pub use machine::{ContextProvider, FocusResolver, Palette};
pub use preview::Preview;
pub use state::{PaletteState, Phase, PreviewPhase, Status, StatusVariant};
pub use view::{PaletteView, PreviewView, ViewItem};
