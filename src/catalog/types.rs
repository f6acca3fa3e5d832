//! Command model shared by the binder, the index and the palette.

use std::collections::BTreeSet;

/// Parameters of a command that asks a remote endpoint to generate text.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCallSpec {
    pub endpoint: String,
    /// Prompt sent to the endpoint; supports `{{query}}`, `{{title}}` and
    /// context placeholders.
    pub prompt_template: String,
    /// Overrides the configured remote timeout when set
    pub timeout_ms: Option<u64>,
    /// Overrides the configured fallback text when set
    pub fallback_text: Option<String>,
}

/// What happens when a command is activated.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    /// Show a fixed snippet in the preview, ready to insert
    StaticText { body: String },
    /// Stream a generated response into the preview
    RemoteCall(RemoteCallSpec),
    /// Run a host side effect (copy, open a URL, ...)
    Utility {
        effect_id: String,
        payload: serde_json::Value,
    },
}

impl CommandAction {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandAction::StaticText { .. } => "static",
            CommandAction::RemoteCall(_) => "remote",
            CommandAction::Utility { .. } => "utility",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub title: String,
    pub description: String,
    /// Lowercased, trimmed, deduplicated
    pub tags: BTreeSet<String>,
    /// Label of the owning group
    pub group: String,
    /// Utility commands close the palette unless this is set
    pub keep_open: bool,
    pub action: CommandAction,
}

impl Command {
    pub fn new(title: impl Into<String>, action: CommandAction) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            group: String::new(),
            keep_open: !matches!(action, CommandAction::Utility { .. }),
            action,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_keep_open(mut self, keep_open: bool) -> Self {
        self.keep_open = keep_open;
        self
    }
}

/// Ordered commands sharing a label. Display order matters.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: String,
    pub commands: Vec<Command>,
}

impl Group {
    /// Build a group, stamping each command with the group label.
    pub fn new(label: impl Into<String>, commands: Vec<Command>) -> Self {
        let label = label.into();
        let commands = commands
            .into_iter()
            .map(|mut command| {
                command.group = label.clone();
                command
            })
            .collect();
        Self { label, commands }
    }
}

pub(crate) fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
