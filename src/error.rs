use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Error taxonomy for the translation cache.
///
/// Gateway and provider failures are recovered inside the dispatcher and
/// never reach the rendering layer; they surface here only at the seams
/// (gateway/provider implementations) and in logs.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The language tag is empty or contains characters outside ISO 639
    /// conventions.
    #[error("invalid language tag: {0:?}")]
    InvalidLanguage(String),

    /// Read or write against the shared persistent translation store failed.
    #[error("persistent cache error: {0}")]
    Gateway(String),

    /// The external translation provider call failed (network, quota, or a
    /// malformed response).
    #[error("translation provider error: {0}")]
    Provider(String),

    /// The provider broke the batch contract: response cardinality must match
    /// the request. Zipping a mismatched response would mis-pair entries.
    #[error("provider returned {got} translations for a batch of {want}")]
    BatchMismatch { want: usize, got: usize },

    /// The batch is larger than the provider accepts in a single call.
    #[error("translation batch of {len} exceeds provider limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
}

impl From<sqlx::Error> for CacheError {
    fn from(error: sqlx::Error) -> Self {
        CacheError::Gateway(error.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(error: reqwest::Error) -> Self {
        CacheError::Provider(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_mismatch_message() {
        let error = CacheError::BatchMismatch { want: 3, got: 2 };
        assert_eq!(
            error.to_string(),
            "provider returned 2 translations for a batch of 3"
        );
    }

    #[test]
    fn test_invalid_language_message_quotes_tag() {
        let error = CacheError::InvalidLanguage("bad tag".to_string());
        assert!(error.to_string().contains("\"bad tag\""));
    }

    #[test]
    fn test_gateway_error_wraps_message() {
        let error = CacheError::Gateway("connection refused".to_string());
        assert!(error.to_string().contains("connection refused"));
    }
}
