//! Command catalog
//!
//! Maps raw command descriptors into the uniform [`Command`] contract and
//! flattens them into a searchable [`CatalogIndex`].
//!
//! - `types` - Command, Group and the polymorphic CommandAction
//! - `binder` - raw JSON descriptors -> Groups (unknown types skipped)
//! - `index` - flattened (group, command) entries with precomputed haystacks

mod binder;
mod index;
mod types;

pub use binder::{bind_groups, bind_json, BoundCatalog, RawGroup};
pub use index::{CatalogIndex, IndexEntry};
pub use types::{Command, CommandAction, Group, RemoteCallSpec};
