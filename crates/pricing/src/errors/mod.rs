//! Error types and retry classification for the pricing crate.
//!
//! This module provides:
//! - [`PricingError`]: The main error enum for all pricing operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while resolving a card price.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the fallback orchestrator handles the error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// The caller sent an unusable request (missing card name, bad batch body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The listing source could not be reached, or refused our credentials.
    #[error("Source unavailable: {provider} - {message}")]
    SourceUnavailable {
        /// The source that failed
        provider: String,
        /// What went wrong
        message: String,
    },

    /// The listing source answered with something we cannot decode into listings.
    #[error("Source parse error: {provider} - {message}")]
    SourceParse {
        /// The source whose response failed to decode
        provider: String,
        /// Description of the decoding failure
        message: String,
    },

    /// The source does not implement the requested operation.
    #[error("{operation} not supported by {provider}")]
    NotSupported {
        /// The operation that was attempted
        operation: String,
        /// The source that lacks it
        provider: String,
    },

    /// The result cache could not be read or written.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl PricingError {
    /// Shorthand for a [`PricingError::SourceUnavailable`].
    pub fn unavailable(provider: &str, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`PricingError::SourceParse`].
    pub fn parse(provider: &str, message: impl Into<String>) -> Self {
        Self::SourceParse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardcatch_pricing::errors::{PricingError, RetryClass};
    ///
    /// let error = PricingError::unavailable("EBAY_BROWSE", "connection reset");
    /// assert_eq!(error.retry_class(), RetryClass::RetryOnce);
    ///
    /// let error = PricingError::InvalidRequest("cardName is required".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidRequest(_) | Self::Cache(_) => RetryClass::Never,
            Self::SourceUnavailable { .. } => RetryClass::RetryOnce,
            Self::SourceParse { .. } | Self::NotSupported { .. } => RetryClass::TreatAsEmpty,
        }
    }
}
