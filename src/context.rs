//! Session orchestration: the surface UI components talk to.
//!
//! `register` and `lookup` run synchronously inside a rendering pass and
//! never touch the network; `settle` runs after the pass commits and drives
//! the dispatcher. The context is created once per session and torn down
//! with it; cloning is cheap and shares the same session state.

use crate::dispatcher::{BatchDispatcher, FlushReport};
use crate::gateway::PersistentCacheGateway;
use crate::language::LanguageTag;
use crate::provider::TranslationProvider;
use crate::store::TranslationStore;
use crate::tracker::RegistrationTracker;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Default)]
struct SessionStats {
    lookup_hits: AtomicUsize,
    lookup_misses: AtomicUsize,
    flush_cycles: AtomicUsize,
    resolved_from_cache: AtomicUsize,
    resolved_from_provider: AtomicUsize,
    unresolved: AtomicUsize,
}

impl SessionStats {
    fn record_flush(&self, report: &FlushReport) {
        self.flush_cycles.fetch_add(1, Ordering::Relaxed);
        self.resolved_from_cache
            .fetch_add(report.from_cache, Ordering::Relaxed);
        self.resolved_from_provider
            .fetch_add(report.from_provider, Ordering::Relaxed);
        self.unresolved.fetch_add(report.unresolved, Ordering::Relaxed);
    }
}

/// Point-in-time session counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    /// Lookups answered from the session store
    pub lookup_hits: usize,

    /// Lookups that fell back to the source string
    pub lookup_misses: usize,

    /// Hit rate as a percentage (0-100)
    pub lookup_hit_rate: f64,

    /// Dispatch cycles run this session
    pub flush_cycles: usize,

    /// Strings resolved by the persistent tier
    pub resolved_from_cache: usize,

    /// Strings resolved by the provider
    pub resolved_from_provider: usize,

    /// Cycle outcomes that left strings untranslated
    pub unresolved: usize,
}

struct ContextInner {
    source_language: LanguageTag,
    active: Mutex<LanguageTag>,
    store: Mutex<TranslationStore>,
    tracker: Mutex<RegistrationTracker>,
    in_flight: Mutex<HashSet<LanguageTag>>,
    dispatcher: BatchDispatcher,
    stats: SessionStats,
}

/// Per-session language context.
///
/// Starts with the source language active, so nothing queues until the user
/// switches to a translation target.
#[derive(Clone)]
pub struct LanguageContext {
    inner: Arc<ContextInner>,
}

impl LanguageContext {
    pub fn new(
        source_language: LanguageTag,
        gateway: Arc<dyn PersistentCacheGateway>,
        provider: Option<Arc<dyn TranslationProvider>>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                active: Mutex::new(source_language.clone()),
                source_language,
                store: Mutex::new(TranslationStore::new()),
                tracker: Mutex::new(RegistrationTracker::new()),
                in_flight: Mutex::new(HashSet::new()),
                dispatcher: BatchDispatcher::new(gateway, provider),
                stats: SessionStats::default(),
            }),
        }
    }

    pub fn source_language(&self) -> &LanguageTag {
        &self.inner.source_language
    }

    pub fn active_language(&self) -> LanguageTag {
        self.inner.active.lock().unwrap().clone()
    }

    /// Switch the active language. An in-flight flush for the previous
    /// language is not cancelled - its results stay valid, they are just
    /// not immediately useful. Registration starts accumulating under the
    /// new language from here on.
    pub fn set_language(&self, language: LanguageTag) {
        let mut active = self.inner.active.lock().unwrap();
        if *active != language {
            debug!("switching active language {} -> {}", *active, language);
            *active = language;
        }
    }

    /// Note a source string as displayed this rendering pass. Synchronous,
    /// no I/O; call it for every piece of user-facing text, every pass.
    pub fn register(&self, source: &str) {
        let active = self.active_language();
        if active == self.inner.source_language {
            return;
        }
        let store = self.inner.store.lock().unwrap();
        let mut tracker = self.inner.tracker.lock().unwrap();
        tracker.register(&store, &self.inner.source_language, &active, source);
    }

    /// The string to display for `source` under the active language.
    ///
    /// Total and synchronous: falls back to `source` itself whenever no
    /// translation exists yet, and is identity for the source language.
    pub fn lookup(&self, source: &str) -> String {
        let active = self.active_language();
        if active == self.inner.source_language {
            return source.to_string();
        }
        let store = self.inner.store.lock().unwrap();
        match store.get(&active, source) {
            Some(translated) => {
                self.inner.stats.lookup_hits.fetch_add(1, Ordering::Relaxed);
                translated.to_string()
            }
            None => {
                self.inner.stats.lookup_misses.fetch_add(1, Ordering::Relaxed);
                source.to_string()
            }
        }
    }

    /// Strings currently awaiting dispatch for the active language.
    pub fn pending_len(&self) -> usize {
        let active = self.active_language();
        self.inner.tracker.lock().unwrap().pending_len(&active)
    }

    /// Settle the rendering pass: dispatch everything registered under the
    /// active language.
    ///
    /// Cycles are serialized per language - if a flush for this language is
    /// already in flight, this call is a no-op and the pending strings stay
    /// queued for that flush's follow-on cycle (or the next settle). Strings
    /// registered while a cycle is running are picked up by a follow-on
    /// cycle before the in-flight slot is released, so at most one provider
    /// call per language is outstanding at any time.
    pub async fn settle(&self) -> FlushReport {
        let language = self.active_language();
        if language == self.inner.source_language {
            return FlushReport::default();
        }

        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight, &language) else {
            debug!("flush already in flight for {}; strings stay pending", language);
            return FlushReport::default();
        };

        let mut total = FlushReport::default();
        loop {
            let snapshot = self.inner.tracker.lock().unwrap().drain(&language);
            if snapshot.is_empty() {
                break;
            }
            let report = self
                .inner
                .dispatcher
                .flush(&language, snapshot, &self.inner.store)
                .await;
            self.inner.stats.record_flush(&report);
            total.absorb(report);
        }
        total
    }

    pub fn stats(&self) -> StatsReport {
        let stats = &self.inner.stats;
        let hits = stats.lookup_hits.load(Ordering::Relaxed);
        let misses = stats.lookup_misses.load(Ordering::Relaxed);
        let queries = hits + misses;
        let lookup_hit_rate = if queries > 0 {
            (hits as f64 / queries as f64) * 100.0
        } else {
            0.0
        };

        StatsReport {
            lookup_hits: hits,
            lookup_misses: misses,
            lookup_hit_rate,
            flush_cycles: stats.flush_cycles.load(Ordering::Relaxed),
            resolved_from_cache: stats.resolved_from_cache.load(Ordering::Relaxed),
            resolved_from_provider: stats.resolved_from_provider.load(Ordering::Relaxed),
            unresolved: stats.unresolved.load(Ordering::Relaxed),
        }
    }
}

/// Holds the per-language dispatch slot; released on drop.
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<LanguageTag>>,
    language: LanguageTag,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(slots: &'a Mutex<HashSet<LanguageTag>>, language: &LanguageTag) -> Option<Self> {
        let mut held = slots.lock().unwrap();
        if held.insert(language.clone()) {
            Some(Self {
                slots,
                language: language.clone(),
            })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut held) = self.slots.lock() {
            held.remove(&self.language);
        }
    }
}
