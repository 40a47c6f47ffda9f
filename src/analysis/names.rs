//! Alias-aware character name lookup.

use std::collections::BTreeSet;

use crate::models::Character;

/// Maps every surface form back to its canonical character name.
///
/// Entries are ordered longest-form-first so that lookups behave the same
/// regardless of which alias of a character a text uses.
pub struct NameIndex {
    /// (alias, canonical), sorted by alias length descending then alias.
    entries: Vec<(String, String)>,
}

impl NameIndex {
    pub fn build(characters: &[Character]) -> Self {
        let mut entries: Vec<(String, String)> = characters
            .iter()
            .flat_map(|c| {
                c.aliases
                    .iter()
                    .map(move |a| (a.clone(), c.name.clone()))
            })
            .collect();
        entries.sort_by(|a, b| {
            b.0.chars()
                .count()
                .cmp(&a.0.chars().count())
                .then_with(|| a.0.cmp(&b.0))
        });
        Self { entries }
    }

    /// Canonical names of all characters mentioned in `text`.
    pub fn find(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for (alias, canonical) in &self.entries {
            if text.contains(alias.as_str()) {
                found.insert(canonical.clone());
            }
        }
        found
    }

    /// Whether `text` mentions the character with canonical name `name`.
    pub fn mentions(&self, text: &str, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(alias, canonical)| canonical == name && text.contains(alias.as_str()))
    }

    /// Earliest byte position at which any alias of `name` occurs in `text`.
    pub fn first_position(&self, text: &str, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .filter(|(_, canonical)| canonical == name)
            .filter_map(|(alias, _)| text.find(alias.as_str()))
            .min()
    }

    /// Resolve a surface form to its canonical name, if known.
    pub fn resolve(&self, surface: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(alias, _)| alias == surface)
            .map(|(_, canonical)| canonical.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;

    fn character(name: &str, aliases: &[&str]) -> Character {
        let mut set: BTreeSet<String> = aliases.iter().map(|a| a.to_string()).collect();
        set.insert(name.to_string());
        Character {
            name: name.into(),
            aliases: set,
            mention_count: 3,
            first_appearance: 1,
            chapters_present: BTreeSet::from([1]),
            importance: 0.0,
            degree_centrality: 0.0,
            classification: Classification::Supporting,
        }
    }

    #[test]
    fn test_find_resolves_alias_to_canonical() {
        let index = NameIndex::build(&[character("林惊羽", &["惊羽"]), character("陆雪琪", &[])]);
        let found = index.find("惊羽与陆雪琪同行。");
        assert!(found.contains("林惊羽"));
        assert!(found.contains("陆雪琪"));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_mentions_by_any_alias() {
        let index = NameIndex::build(&[character("林惊羽", &["惊羽"])]);
        assert!(index.mentions("惊羽去了", "林惊羽"));
        assert!(!index.mentions("别人去了", "林惊羽"));
    }

    #[test]
    fn test_resolve_surface_form() {
        let index = NameIndex::build(&[character("林惊羽", &["惊羽"])]);
        assert_eq!(index.resolve("惊羽"), Some("林惊羽"));
        assert_eq!(index.resolve("无名"), None);
    }
}
