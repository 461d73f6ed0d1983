//! Language tags: validated, opaque identifiers for translation targets.
//!
//! Tags are treated as opaque keys (BCP 47-like, e.g. "en", "es", "pt-BR").
//! No normalization is applied: `"pt-BR"` and `"pt-br"` are distinct keys,
//! matching the partitioning of both cache tiers.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated language tag.
///
/// Validation is purely syntactic: non-empty, ASCII alphanumerics plus `-`
/// and `_`. The set of languages is open-world; whether a tag is meaningful
/// is the translation provider's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Create a tag from a string, validating its syntax.
    pub fn new(tag: impl Into<String>) -> CacheResult<Self> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(CacheError::InvalidLanguage(tag));
        }
        if !tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CacheError::InvalidLanguage(tag));
        }
        Ok(Self(tag))
    }

    /// The tag as a string slice (e.g. for binding into queries).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageTag {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
