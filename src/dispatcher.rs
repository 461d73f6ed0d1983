//! Settlement phase: resolve everything a rendering pass registered.
//!
//! Runs after the pass has committed, so it may await freely; the rendering
//! side never blocks on it. All I/O of the subsystem lives here. Failures
//! of either tier degrade the cycle and are logged; they never surface to
//! the rendering layer, which keeps showing source-language text until a
//! later cycle succeeds.

use crate::gateway::PersistentCacheGateway;
use crate::language::LanguageTag;
use crate::provider::TranslationProvider;
use crate::store::TranslationStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Outcome of one dispatch cycle, for logs and session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Strings in the drained snapshot.
    pub requested: usize,
    /// Resolved by the persistent tier (including entries other sessions
    /// wrote).
    pub from_cache: usize,
    /// Resolved by the provider call.
    pub from_provider: usize,
    /// Still untranslated after the cycle; they re-enter the pending set
    /// the next time a rendering pass registers them.
    pub unresolved: usize,
}

impl FlushReport {
    pub(crate) fn absorb(&mut self, other: FlushReport) {
        self.requested += other.requested;
        self.from_cache += other.from_cache;
        self.from_provider += other.from_provider;
        self.unresolved += other.unresolved;
    }
}

/// Turns the pending set of a rendering pass into at most one gateway read,
/// one provider batch and one merge write.
pub struct BatchDispatcher {
    gateway: Arc<dyn PersistentCacheGateway>,
    provider: Option<Arc<dyn TranslationProvider>>,
}

impl BatchDispatcher {
    pub fn new(
        gateway: Arc<dyn PersistentCacheGateway>,
        provider: Option<Arc<dyn TranslationProvider>>,
    ) -> Self {
        Self { gateway, provider }
    }

    /// Run one dispatch cycle for `language` over an already-drained
    /// snapshot.
    ///
    /// The store lock is only taken between awaits, never across them.
    pub async fn flush(
        &self,
        language: &LanguageTag,
        snapshot: Vec<String>,
        store: &Mutex<TranslationStore>,
    ) -> FlushReport {
        if snapshot.is_empty() {
            return FlushReport::default();
        }
        let requested = snapshot.len();

        // One persistent read per cycle. A failure degrades the cycle to
        // provider-only, as if the document were empty.
        let persisted = match self.gateway.read_all(language).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("persistent cache read failed for {}: {}", language, e);
                HashMap::new()
            }
        };

        let missing: Vec<String> = {
            let mut store = store.lock().unwrap();
            let merged = store.merge(language, persisted);
            if merged > 0 {
                debug!("merged {} persisted translations for {}", merged, language);
            }
            snapshot
                .into_iter()
                .filter(|source| !store.contains(language, source))
                .collect()
        };
        let from_cache = requested - missing.len();

        if missing.is_empty() {
            debug!(
                "all {} strings for {} resolved from the persistent cache",
                requested, language
            );
            return FlushReport {
                requested,
                from_cache,
                from_provider: 0,
                unresolved: 0,
            };
        }

        let Some(provider) = &self.provider else {
            debug!(
                "no translation provider configured; {} strings for {} stay untranslated",
                missing.len(),
                language
            );
            return FlushReport {
                requested,
                from_cache,
                from_provider: 0,
                unresolved: missing.len(),
            };
        };

        let translated = match provider.translate_batch(&missing, language).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(
                    "provider {} failed for {} strings to {}: {}",
                    provider.name(),
                    missing.len(),
                    language,
                    e
                );
                return FlushReport {
                    requested,
                    from_cache,
                    from_provider: 0,
                    unresolved: missing.len(),
                };
            }
        };

        // Zipping by position is only sound when cardinality holds.
        if translated.len() != missing.len() {
            warn!(
                "provider {} returned {} translations for a batch of {}; discarding response",
                provider.name(),
                translated.len(),
                missing.len()
            );
            return FlushReport {
                requested,
                from_cache,
                from_provider: 0,
                unresolved: missing.len(),
            };
        }

        let mut resolved = HashMap::with_capacity(missing.len());
        {
            let mut store = store.lock().unwrap();
            for (source, translated) in missing.iter().zip(translated) {
                // An empty translation must never reach a lookup.
                if translated.is_empty() {
                    warn!(
                        "provider {} returned an empty translation for {:?}; skipping",
                        provider.name(),
                        source
                    );
                    continue;
                }
                store.insert(language, source.clone(), translated.clone());
                resolved.insert(source.clone(), translated);
            }
        }

        let from_provider = resolved.len();
        let unresolved = missing.len() - from_provider;

        // Best effort: the session store already has the values; losing the
        // write only means the next session pays the provider cost again.
        if !resolved.is_empty() {
            if let Err(e) = self.gateway.merge_write(language, &resolved).await {
                warn!(
                    "failed to persist {} translations for {}: {}",
                    resolved.len(),
                    language,
                    e
                );
            }
        }

        FlushReport {
            requested,
            from_cache,
            from_provider,
            unresolved,
        }
    }
}
