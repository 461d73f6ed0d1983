//! On-demand UI-string translation cache with deferred batch dispatch.
//!
//! UI components call [`LanguageContext::register`] for every piece of
//! user-facing text while rendering and [`LanguageContext::lookup`] to get
//! the text to display (falling back to the source string until a
//! translation exists). After the rendering pass settles,
//! [`LanguageContext::settle`] runs one dispatch cycle: the pending strings
//! are resolved against the shared persistent cache first, and only the
//! remainder goes to the external translation provider as a single batch.
//!
//! # Architecture
//!
//! - `store`: tier-1 cache - per-session, in-memory, synchronous
//! - `tracker`: collection phase - pending strings per rendering pass
//! - `gateway`: tier-2 cache - shared multi-writer persistent store
//! - `provider`: external translation backend, one batch per cycle
//! - `dispatcher`: settlement phase tying the tiers together
//! - `context`: the per-session surface UI code talks to
//!
//! # Example
//!
//! ```rust,ignore
//! use ui_translation_cache::{LanguageContext, LanguageTag, MemoryCacheGateway};
//! use std::sync::Arc;
//!
//! let context = LanguageContext::new(
//!     LanguageTag::new("en")?,
//!     Arc::new(MemoryCacheGateway::new()),
//!     None,
//! );
//! context.set_language(LanguageTag::new("es")?);
//!
//! // Rendering pass: collect + display
//! context.register("Patient intake");
//! let label = context.lookup("Patient intake");
//!
//! // After the pass commits
//! context.settle().await;
//! ```

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod language;
pub mod provider;
pub mod retry;
pub mod store;
pub mod tracker;

pub use config::Config;
pub use context::{LanguageContext, StatsReport};
pub use dispatcher::{BatchDispatcher, FlushReport};
pub use error::{CacheError, CacheResult};
pub use gateway::{MemoryCacheGateway, PersistentCacheGateway, PgCacheGateway};
pub use language::LanguageTag;
pub use provider::{HttpTranslationProvider, MockMode, MockProvider, TranslationProvider};
pub use store::TranslationStore;
pub use tracker::RegistrationTracker;
