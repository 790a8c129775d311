//! Unified error types for the session resolution engine.
//!
//! Two of these variants are expected control-flow signals rather than
//! failures: [`FetchError::UnsupportedEvent`] means no supplier accepts an
//! event, and [`FetchError::UnsupportedOperation`] means a platform does not
//! implement a query. The facade treats both as cache/fallback misses.

use thiserror::Error;

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors that can occur while resolving sessions or querying platform data.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// No supplier (typed or wildcard) accepts this event, or the chosen
    /// supplier signalled that it cannot handle this particular value.
    #[error("event '{kind}' is not supported")]
    UnsupportedEvent {
        /// Diagnostic name of the rejected event.
        kind: String,
    },

    /// The platform does not implement this query method.
    #[error("query not supported by this platform")]
    UnsupportedOperation,

    /// A required key is absent from supplied data.
    #[error("missing key '{0}' in supplied data")]
    MissingKey(String),

    /// A supplied value holds a different kind than the extractor requires.
    #[error("key '{key}' holds the wrong kind of value (expected {expected})")]
    WrongKind {
        /// The offending key.
        key: String,
        /// The kind the extractor required.
        expected: &'static str,
    },

    /// An upstream platform call failed and could not be degraded from.
    #[error("platform call failed: {0}")]
    Upstream(String),
}

impl FetchError {
    /// Creates an unsupported-event error for the given diagnostic name.
    pub fn unsupported_event(kind: impl Into<String>) -> Self {
        Self::UnsupportedEvent { kind: kind.into() }
    }

    /// Creates an upstream failure error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Returns `true` for the two expected "not supported" signals.
    ///
    /// The query facade uses this to tell fallback-eligible misses apart
    /// from real failures.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedEvent { .. } | Self::UnsupportedOperation
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result type for fetch and query operations.
pub type FetchResult<T> = Result<T, FetchError>;
