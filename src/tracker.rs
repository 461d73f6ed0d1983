//! Collection phase: strings seen during a rendering pass.
//!
//! `register` runs inline during UI construction, so it must never perform
//! I/O or block. It only mutates the pending set; the settlement phase
//! (`dispatcher`) consumes what accumulates here after the pass commits.

use crate::language::LanguageTag;
use crate::store::TranslationStore;
use std::collections::{HashMap, HashSet};

/// Deduplicated, insertion-ordered set of source strings awaiting dispatch.
///
/// Insertion order is preserved through `drain` and becomes the order of the
/// provider batch.
#[derive(Debug, Default)]
pub struct PendingSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl PendingSet {
    fn insert(&mut self, source: &str) -> bool {
        if self.seen.insert(source.to_string()) {
            self.order.push(source.to_string());
            true
        } else {
            false
        }
    }

    fn drain(&mut self) -> Vec<String> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Tracks registrations per language for the current rendering pass.
#[derive(Debug, Default)]
pub struct RegistrationTracker {
    pending: HashMap<LanguageTag, PendingSet>,
}

impl RegistrationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source string as needed under `language`.
    ///
    /// No-op when `language` is the source language (nothing to translate)
    /// or when the store already holds the key (already resolved). Safe to
    /// call every rendering pass for the same string. Returns whether the
    /// string was newly queued.
    pub fn register(
        &mut self,
        store: &TranslationStore,
        source_language: &LanguageTag,
        language: &LanguageTag,
        source: &str,
    ) -> bool {
        if language == source_language {
            return false;
        }
        if store.contains(language, source) {
            return false;
        }
        self.pending.entry(language.clone()).or_default().insert(source)
    }

    /// Snapshot and clear the pending set for a language. Registrations that
    /// land after this call accumulate in a fresh set for the next cycle.
    pub fn drain(&mut self, language: &LanguageTag) -> Vec<String> {
        self.pending
            .get_mut(language)
            .map(PendingSet::drain)
            .unwrap_or_default()
    }

    pub fn pending_len(&self, language: &LanguageTag) -> usize {
        self.pending.get(language).map_or(0, PendingSet::len)
    }
}
