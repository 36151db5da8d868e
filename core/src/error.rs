//! Error taxonomy for the request pipeline.
//!
//! # Design
//! Every failure a call can end in is one of four variants, delivered through
//! the caller's failure callback. `Custom` covers both transport errors and
//! backend-reported errors; its `reason` is the text the caller should show.

/// Boxed error used for transform and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal failure of a single `Client::execute` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Base address, path and parameters do not form a valid URL.
    #[error("Malformed request URL")]
    MalformedUrl,

    /// The request body could not be serialized. No network access happened.
    #[error("Encoding error")]
    Encoding,

    /// Transport error, backend-reported error, or undecodable response.
    #[error("{reason}")]
    Custom { reason: String },

    /// The transport finished with neither data nor an error.
    #[error("Unknown error")]
    Unknown,
}

impl Error {
    pub fn custom(reason: impl Into<String>) -> Self {
        Error::Custom {
            reason: reason.into(),
        }
    }
}
