//! Tier-2 cache: the shared, multi-writer persistent translation store.
//!
//! One logical document per language, `source → translated`. Every session
//! in the fleet reads and writes the same documents, so writes are additive
//! merges: a key another writer already populated is never clobbered
//! (first-writer-wins per key). That discipline is the sole mechanism
//! protecting the store under concurrent writers; no distributed lock is
//! used or needed.

use crate::error::CacheResult;
use crate::language::LanguageTag;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Read/write access to the shared per-language translation documents.
#[async_trait]
pub trait PersistentCacheGateway: Send + Sync {
    /// Fetch the full persisted translation map for a language.
    /// An absent document yields an empty map, not an error.
    async fn read_all(&self, language: &LanguageTag) -> CacheResult<HashMap<String, String>>;

    /// Merge new entries into the shared document. Keys already present keep
    /// the value the first writer stored.
    async fn merge_write(
        &self,
        language: &LanguageTag,
        entries: &HashMap<String, String>,
    ) -> CacheResult<()>;
}

/// PostgreSQL-backed gateway shared by every session in the fleet.
#[derive(Clone)]
pub struct PgCacheGateway {
    pool: PgPool,
}

impl PgCacheGateway {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> CacheResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let gateway = Self { pool };
        gateway.ensure_schema().await?;
        Ok(gateway)
    }

    async fn ensure_schema(&self) -> CacheResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translations (
                language TEXT NOT NULL,
                source_text TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (language, source_text)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PersistentCacheGateway for PgCacheGateway {
    async fn read_all(&self, language: &LanguageTag) -> CacheResult<HashMap<String, String>> {
        let rows = sqlx::query(
            "SELECT source_text, translated_text FROM translations WHERE language = $1",
        )
        .bind(language.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let source: String = row.try_get("source_text")?;
            let translated: String = row.try_get("translated_text")?;
            entries.insert(source, translated);
        }
        Ok(entries)
    }

    async fn merge_write(
        &self,
        language: &LanguageTag,
        entries: &HashMap<String, String>,
    ) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        // ON CONFLICT DO NOTHING is the merge discipline: concurrent writers
        // union their keys, first writer wins per key.
        let now = chrono::Utc::now();
        let mut tx = self.pool.begin().await?;
        for (source, translated) in entries {
            sqlx::query(
                "INSERT INTO translations (language, source_text, translated_text, created_at)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (language, source_text) DO NOTHING",
            )
            .bind(language.as_str())
            .bind(source)
            .bind(translated)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// In-process gateway: a session-local stand-in for the shared store.
///
/// Used by tests and by deployments without a `DATABASE_URL` (where the
/// persistent tier degrades to per-process). Carries failure-injection
/// switches and call counters so dispatch behavior under gateway failures
/// can be exercised without a database.
#[derive(Debug, Default)]
pub struct MemoryCacheGateway {
    documents: Mutex<HashMap<LanguageTag, HashMap<String, String>>>,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryCacheGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a language document, as if another session had already
    /// resolved these strings.
    pub fn seed(&self, language: &LanguageTag, entries: impl IntoIterator<Item = (String, String)>) {
        let mut documents = self.documents.lock().unwrap();
        let document = documents.entry(language.clone()).or_default();
        for (source, translated) in entries {
            document.entry(source).or_insert(translated);
        }
    }

    /// Copy of the current document for a language.
    pub fn snapshot(&self, language: &LanguageTag) -> HashMap<String, String> {
        self.documents
            .lock()
            .unwrap()
            .get(language)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistentCacheGateway for MemoryCacheGateway {
    async fn read_all(&self, language: &LanguageTag) -> CacheResult<HashMap<String, String>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(crate::error::CacheError::Gateway(
                "simulated read failure".to_string(),
            ));
        }
        Ok(self.snapshot(language))
    }

    async fn merge_write(
        &self,
        language: &LanguageTag,
        entries: &HashMap<String, String>,
    ) -> CacheResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(crate::error::CacheError::Gateway(
                "simulated write failure".to_string(),
            ));
        }
        self.seed(language, entries.clone());
        Ok(())
    }
}
