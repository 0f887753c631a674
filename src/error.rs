//! Error types for SCU operations

use thiserror::Error;

/// Result type alias for SCU operations
pub type Result<T> = std::result::Result<T, FindError>;

/// Error types that can occur while validating or executing a query.
///
/// Display strings double as the user-visible failure messages carried in
/// the outbound Response Envelope, so they are kept stable.
#[derive(Error, Debug)]
pub enum FindError {
    /// Bad or missing input, detected before any network resource is acquired
    #[error("{0}")]
    Validation(String),

    /// The target endpoint could not be reached
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Association negotiation failed (rejection, no shared presentation
    /// context, malformed reply)
    #[error("Association failed: {0}")]
    Association(String),

    /// The peer answered with a terminal status other than SUCCESS
    #[error("Find-scu request failed")]
    RequestFailed {
        /// DIMSE status code reported by the peer
        status: u16,
    },

    /// The peer answered a verification request with a non-SUCCESS status
    #[error("Echo-scu request failed")]
    EchoFailed {
        /// DIMSE status code reported by the peer
        status: u16,
    },

    /// The peer closed the association mid-exchange
    #[error("Association was closed: {0}")]
    AssociationClosed(String),

    /// A PENDING response carried a dataset that could not be decoded.
    /// Non-fatal: the response loop skips the response and keeps reading.
    #[error("Malformed response dataset: {0}")]
    DatasetParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FindError {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborts the query. Only per-response dataset
    /// decoding failures are survivable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FindError::DatasetParse(_))
    }
}
