//! Raw command descriptors -> uniform commands.
//!
//! Descriptors arrive as loosely-typed JSON (`{type, title, description, tags,
//! body|endpoint|effectId, ...}`). Each item is bound independently: an
//! unknown `type` or a malformed item is skipped with a diagnostic and never
//! aborts the rest of the catalog.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{normalize_tags, Command, CommandAction, Group, RemoteCallSpec};
use crate::error::PaletteError;

const DEFAULT_GROUP_LABEL: &str = "Commands";
const UNTITLED: &str = "Untitled";

/// One group of raw descriptors as supplied by the host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGroup {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// Bound groups plus the diagnostics for every skipped item.
#[derive(Debug, Default)]
pub struct BoundCatalog {
    pub groups: Vec<Group>,
    pub skipped: Vec<PaletteError>,
}

impl BoundCatalog {
    pub fn command_count(&self) -> usize {
        self.groups.iter().map(|g| g.commands.len()).sum()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Csv(String),
}

impl RawTags {
    fn into_list(self) -> Vec<String> {
        match self {
            RawTags::List(list) => list,
            RawTags::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommon {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<RawTags>,
    #[serde(default)]
    keep_open: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawStatic {
    #[serde(flatten)]
    common: RawCommon,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRemote {
    #[serde(flatten)]
    common: RawCommon,
    endpoint: String,
    #[serde(default, alias = "prompt")]
    prompt_template: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    fallback_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUtility {
    #[serde(flatten)]
    common: RawCommon,
    effect_id: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Recognized descriptor kinds, keyed by the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorKind {
    Static,
    Remote,
    Utility,
}

impl DescriptorKind {
    fn from_type(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "static" | "snippet" | "text" => Some(Self::Static),
            "remote" | "ai" | "webhook" => Some(Self::Remote),
            "utility" | "effect" => Some(Self::Utility),
            _ => None,
        }
    }
}

/// Bind a JSON array of raw groups.
pub fn bind_json(json: &str) -> Result<BoundCatalog> {
    let raw: Vec<RawGroup> =
        serde_json::from_str(json).context("Catalog must be a JSON array of groups")?;
    Ok(bind_groups(&raw))
}

/// Bind raw groups into commands, skipping anything malformed.
pub fn bind_groups(raw_groups: &[RawGroup]) -> BoundCatalog {
    let mut bound = BoundCatalog::default();

    for raw_group in raw_groups {
        let label = raw_group
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_GROUP_LABEL)
            .to_string();

        let mut commands = Vec::with_capacity(raw_group.items.len());
        for item in &raw_group.items {
            match bind_item(item) {
                Ok(command) => commands.push(command),
                Err(err) => {
                    warn!(group = %label, error = %err, "Skipping catalog item");
                    bound.skipped.push(err);
                }
            }
        }

        bound.groups.push(Group::new(label, commands));
    }

    debug!(
        groups = bound.groups.len(),
        commands = bound.command_count(),
        skipped = bound.skipped.len(),
        "Catalog bound"
    );
    bound
}

fn bind_item(item: &serde_json::Value) -> Result<Command, PaletteError> {
    let title_hint = item
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or(UNTITLED)
        .to_string();

    let kind_name = item.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let kind = DescriptorKind::from_type(kind_name).ok_or_else(|| PaletteError::Catalog {
        title: title_hint.clone(),
        reason: format!("unknown type '{}'", kind_name),
    })?;

    let malformed = |e: serde_json::Error| PaletteError::Catalog {
        title: title_hint.clone(),
        reason: e.to_string(),
    };

    let (common, action) = match kind {
        DescriptorKind::Static => {
            let raw: RawStatic = serde_json::from_value(item.clone()).map_err(malformed)?;
            (raw.common, CommandAction::StaticText { body: raw.body })
        }
        DescriptorKind::Remote => {
            let raw: RawRemote = serde_json::from_value(item.clone()).map_err(malformed)?;
            if raw.endpoint.trim().is_empty() {
                return Err(PaletteError::Catalog {
                    title: title_hint,
                    reason: "remote item has an empty endpoint".to_string(),
                });
            }
            let prompt_template = raw
                .prompt_template
                .or_else(|| raw.common.title.clone())
                .unwrap_or_default();
            (
                raw.common,
                CommandAction::RemoteCall(RemoteCallSpec {
                    endpoint: raw.endpoint,
                    prompt_template,
                    timeout_ms: raw.timeout_ms,
                    fallback_text: raw.fallback_text,
                }),
            )
        }
        DescriptorKind::Utility => {
            let raw: RawUtility = serde_json::from_value(item.clone()).map_err(malformed)?;
            (
                raw.common,
                CommandAction::Utility {
                    effect_id: raw.effect_id,
                    payload: raw.payload,
                },
            )
        }
    };

    let title = common
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let mut command = Command::new(title, action)
        .with_description(common.description.unwrap_or_default());
    command.tags = normalize_tags(common.tags.map(RawTags::into_list).unwrap_or_default());
    if let Some(keep_open) = common.keep_open {
        command.keep_open = keep_open;
    }
    Ok(command)
}
