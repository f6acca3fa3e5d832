//! Utility effects run by `Utility` commands.
//!
//! Two effects are built in: `copy-text` and `open-url`. Hosts register more
//! by id; registering an existing id replaces it.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::clipboard::ClipboardSink;

pub const COPY_TEXT: &str = "copy-text";
pub const OPEN_URL: &str = "open-url";

/// What an effect may touch while it runs.
pub struct EffectContext<'a> {
    pub palette_id: &'a str,
    pub query: &'a str,
    pub clipboard: &'a dyn ClipboardSink,
}

pub type EffectFn = dyn Fn(&Value, &EffectContext<'_>) -> Result<()> + Send + Sync;

#[derive(Clone)]
pub struct EffectRegistry {
    effects: HashMap<String, Arc<EffectFn>>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.effects.keys().collect();
        ids.sort();
        f.debug_struct("EffectRegistry").field("effects", &ids).finish()
    }
}

impl EffectRegistry {
    /// Registry with the built-in effects.
    pub fn new() -> Self {
        let mut registry = Self {
            effects: HashMap::new(),
        };
        registry.register(COPY_TEXT, copy_text);
        registry.register(OPEN_URL, open_url);
        registry
    }

    pub fn register<F>(&mut self, id: impl Into<String>, effect: F)
    where
        F: Fn(&Value, &EffectContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.effects.insert(id.into(), Arc::new(effect));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    pub fn run(&self, id: &str, payload: &Value, context: &EffectContext<'_>) -> Result<()> {
        let effect = self
            .effects
            .get(id)
            .ok_or_else(|| anyhow!("Unknown effect '{}'", id))?;
        debug!(effect_id = id, palette_id = context.palette_id, "Running effect");
        effect(payload, context)
    }
}

/// A string payload, or `payload[field]` when it's an object.
fn payload_str<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    match payload {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get(field).and_then(Value::as_str),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn copy_text(payload: &Value, context: &EffectContext<'_>) -> Result<()> {
    let text = payload_str(payload, "text").context("copy-text needs a text payload")?;
    context.clipboard.copy_text(text)
}

fn open_url(payload: &Value, _context: &EffectContext<'_>) -> Result<()> {
    let url = payload_str(payload, "url").context("open-url needs a url payload")?;
    if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("mailto:")) {
        bail!("Refusing to open non-web url '{}'", url);
    }
    open::that(url).with_context(|| format!("Failed to open {}", url))?;
    info!(url = url, "Opened url");
    Ok(())
}
