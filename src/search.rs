//! Query parsing and filtering over the [`CatalogIndex`].
//!
//! Matching is a permissive, unscored subsequence test. Ties keep catalog
//! order, except that any free text in the query sorts the matched titles
//! alphabetically for scannability.
//!
//! Tokens beginning with `#` filter on tags (substring containment against the
//! normalized tag set) and are ANDed with every free-text token.

use crate::catalog::CatalogIndex;

/// Marker that turns a query token into a tag filter
pub const TAG_MARKER: char = '#';

/// Case-insensitive subsequence test: every character of `term` must appear in
/// `haystack` in order, not necessarily contiguous. An empty term always
/// matches.
pub fn matches(term: &str, haystack: &str) -> bool {
    let mut pattern = term.chars().flat_map(char::to_lowercase).peekable();
    for ch in haystack.chars().flat_map(char::to_lowercase) {
        match pattern.peek() {
            Some(&p) if p == ch => {
                pattern.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    pattern.peek().is_none()
}

/// A query split into tag filters and free-text tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub tags: Vec<String>,
    pub terms: Vec<String>,
}

impl ParsedQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = ParsedQuery::default();
        for token in query.to_lowercase().split_whitespace() {
            let Some(rest) = token.strip_prefix(TAG_MARKER) else {
                parsed.terms.push(token.to_string());
                continue;
            };

            let tag_len = rest
                .find(|c: char| !is_tag_char(c))
                .unwrap_or(rest.len());
            let (tag, remainder) = rest.split_at(tag_len);
            if !tag.is_empty() {
                parsed.tags.push(tag.to_string());
            }
            if !remainder.is_empty() {
                parsed.terms.push(remainder.to_string());
            }
        }
        parsed
    }

    pub fn has_free_text(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.terms.is_empty()
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

/// Filter the full index against `query`, returning entry indices.
///
/// Always runs against the whole index (never a prior result) so a shrinking
/// query restores items.
pub fn filter(index: &CatalogIndex, query: &str) -> Vec<usize> {
    let parsed = ParsedQuery::parse(query);

    let mut matched: Vec<usize> = index
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| {
            let tags_ok = parsed
                .tags
                .iter()
                .all(|wanted| entry.tags.iter().any(|tag| tag.contains(wanted.as_str())));
            tags_ok
                && parsed
                    .terms
                    .iter()
                    .all(|term| matches(term, &entry.haystack))
        })
        .map(|(idx, _)| idx)
        .collect();

    if parsed.has_free_text() {
        // Stable: equal titles keep catalog order
        matched.sort_by_cached_key(|&idx| {
            index
                .command(idx)
                .map(|c| c.title.to_lowercase())
                .unwrap_or_default()
        });
    }

    matched
}
