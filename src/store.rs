//! Tier-1 cache: per-session, in-memory, partitioned by language.
//!
//! A plain nested map with no I/O and no eviction. Entries are bounded by
//! the number of distinct UI strings, which is small and finite, and live
//! for the session lifetime. Lookups run synchronously inside a rendering
//! pass, so nothing here may block or suspend.

use crate::language::LanguageTag;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TranslationStore {
    languages: HashMap<LanguageTag, HashMap<String, String>>,
}

impl TranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a translation. Source strings are opaque keys; no
    /// normalization is applied.
    pub fn get(&self, language: &LanguageTag, source: &str) -> Option<&str> {
        self.languages
            .get(language)
            .and_then(|entries| entries.get(source))
            .map(String::as_str)
    }

    pub fn contains(&self, language: &LanguageTag, source: &str) -> bool {
        self.get(language, source).is_some()
    }

    /// Insert a translation. Re-inserting the same key is last-write-wins
    /// within this session; the persistent tier has its own (first-writer-
    /// wins) discipline.
    pub fn insert(
        &mut self,
        language: &LanguageTag,
        source: impl Into<String>,
        translated: impl Into<String>,
    ) {
        self.languages
            .entry(language.clone())
            .or_default()
            .insert(source.into(), translated.into());
    }

    /// Bulk-merge entries read from the persistent tier. Keys this session
    /// already holds keep their value. Returns how many entries were new.
    pub fn merge(
        &mut self,
        language: &LanguageTag,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> usize {
        let map = self.languages.entry(language.clone()).or_default();
        let mut added = 0;
        for (source, translated) in entries {
            map.entry(source).or_insert_with(|| {
                added += 1;
                translated
            });
        }
        added
    }

    /// Number of cached entries for a language.
    pub fn len(&self, language: &LanguageTag) -> usize {
        self.languages.get(language).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, language: &LanguageTag) -> bool {
        self.len(language) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(tag: &str) -> LanguageTag {
        LanguageTag::new(tag).expect("valid tag")
    }

    #[test]
    fn test_get_absent_returns_none() {
        let store = TranslationStore::new();
        assert_eq!(store.get(&lang("es"), "Hello"), None);
    }

    #[test]
    fn test_insert_then_get() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "Hello", "Hola");
        assert_eq!(store.get(&lang("es"), "Hello"), Some("Hola"));
    }

    #[test]
    fn test_insert_same_value_is_idempotent() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "Hello", "Hola");
        store.insert(&lang("es"), "Hello", "Hola");
        assert_eq!(store.len(&lang("es")), 1);
        assert_eq!(store.get(&lang("es"), "Hello"), Some("Hola"));
    }

    #[test]
    fn test_insert_different_value_is_last_write_wins() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "Hello", "Hola");
        store.insert(&lang("es"), "Hello", "Buenas");
        assert_eq!(store.get(&lang("es"), "Hello"), Some("Buenas"));
    }

    #[test]
    fn test_languages_are_partitioned() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "Hello", "Hola");
        assert_eq!(store.get(&lang("fr"), "Hello"), None);
        assert_eq!(store.len(&lang("fr")), 0);
    }

    #[test]
    fn test_keys_are_exact_byte_sequences() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "Hello", "Hola");
        assert_eq!(store.get(&lang("es"), "hello"), None);
        assert_eq!(store.get(&lang("es"), "Hello "), None);
    }

    #[test]
    fn test_empty_source_string_is_a_valid_key() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "", "vacío");
        assert_eq!(store.get(&lang("es"), ""), Some("vacío"));
    }

    #[test]
    fn test_merge_keeps_existing_entries() {
        let mut store = TranslationStore::new();
        store.insert(&lang("es"), "Hello", "Hola");

        let added = store.merge(
            &lang("es"),
            vec![
                ("Hello".to_string(), "OTRO".to_string()),
                ("Goodbye".to_string(), "Adiós".to_string()),
            ],
        );

        assert_eq!(added, 1);
        // The session's value survives; only the new key is merged in.
        assert_eq!(store.get(&lang("es"), "Hello"), Some("Hola"));
        assert_eq!(store.get(&lang("es"), "Goodbye"), Some("Adiós"));
    }

    #[test]
    fn test_merge_into_empty_language() {
        let mut store = TranslationStore::new();
        let added = store.merge(
            &lang("fr"),
            vec![("Save".to_string(), "Enregistrer".to_string())],
        );
        assert_eq!(added, 1);
        assert_eq!(store.get(&lang("fr"), "Save"), Some("Enregistrer"));
    }
}
