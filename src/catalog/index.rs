//! Flattened, search-ready view of the catalog.
//!
//! Rebuilt whenever the catalog is replaced and immutable between rebuilds.
//! Each entry keeps a precomputed lowercase haystack so filtering never
//! allocates per keystroke.

use std::collections::BTreeSet;

use super::types::{Command, Group};

/// One `(group, command)` pair in catalog order.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Position of the owning group in the catalog
    pub group: usize,
    /// Position of the command within its group (its identity for the session)
    pub position: usize,
    pub command: Command,
    /// Lowercase title + description + group label + tags
    pub haystack: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<IndexEntry>,
}

impl CatalogIndex {
    pub fn build(groups: &[Group]) -> Self {
        let mut entries = Vec::new();
        for (group_idx, group) in groups.iter().enumerate() {
            for (position, command) in group.commands.iter().enumerate() {
                entries.push(IndexEntry {
                    group: group_idx,
                    position,
                    haystack: haystack_for(command, &group.label),
                    tags: command.tags.clone(),
                    command: command.clone(),
                });
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&IndexEntry> {
        self.entries.get(index)
    }

    pub fn command(&self, index: usize) -> Option<&Command> {
        self.entries.get(index).map(|entry| &entry.command)
    }
}

fn haystack_for(command: &Command, group_label: &str) -> String {
    let mut parts: Vec<&str> = vec![&command.title, &command.description, group_label];
    parts.extend(command.tags.iter().map(String::as_str));
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CommandAction;

    fn snippet(title: &str) -> Command {
        Command::new(
            title,
            CommandAction::StaticText {
                body: format!("{} body", title),
            },
        )
    }

    #[test]
    fn flattens_groups_in_catalog_order() {
        let groups = vec![
            Group::new("Snippets", vec![snippet("Greeting"), snippet("Closing")]),
            Group::new("AI", vec![snippet("Summarize")]),
        ];
        let index = CatalogIndex::build(&groups);

        assert_eq!(index.len(), 3);
        let titles: Vec<_> = index.entries().iter().map(|e| e.command.title.as_str()).collect();
        assert_eq!(titles, vec!["Greeting", "Closing", "Summarize"]);
        assert_eq!(index.get(2).map(|e| (e.group, e.position)), Some((1, 0)));
    }

    #[test]
    fn haystack_is_lowercase_and_includes_group_and_tags() {
        let groups = vec![Group::new(
            "Snippets",
            vec![snippet("Greeting")
                .with_description("Warm Welcome")
                .with_tags(["Hello"])],
        )];
        let index = CatalogIndex::build(&groups);
        assert_eq!(index.entries()[0].haystack, "greeting warm welcome snippets hello");
    }

    #[test]
    fn empty_catalog_builds_empty_index() {
        let index = CatalogIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.command(0).is_none());
    }
}
