//! Quote Provider Port (Driven Port)
//!
//! Interface for fetching the current quote of one symbol from an external
//! market-data provider. Pure request/response: implementations do not
//! retry, cache, or rate-limit.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::quote::{Quote, Symbol};

/// Quote fetch error. Always local to one scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Provider unreachable or transport failure.
    #[error("provider network error: {0}")]
    Network(String),

    /// Provider did not answer within the fetch timeout.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// API key rejected.
    #[error("provider rejected the API key")]
    Unauthorized,

    /// Provider rate limit hit.
    #[error("provider rate limit exceeded")]
    RateLimited,

    /// Provider returned an error status.
    #[error("provider error ({status}): {body}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Provider has no data for the symbol.
    #[error("provider has no quote for symbol {0}")]
    UnknownSymbol(Symbol),

    /// A required field was absent or null.
    #[error("provider response missing field `{0}`")]
    MissingField(&'static str),

    /// Response could not be decoded.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short machine-readable error kind for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Provider { .. } => "provider",
            Self::UnknownSymbol(_) => "unknown_symbol",
            Self::MissingField(_) => "missing_field",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Port for fetching point-in-time quotes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProviderPort: Send + Sync {
    /// Fetch the current quote for `symbol`.
    ///
    /// The returned quote carries the provider's trade time; the insert time
    /// is assigned later by the writer side.
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote, FetchError>;
}
