// ABOUTME: Error type shared by every stage of the fetch/parse pipeline.
// ABOUTME: Provides FeedError with Transport, Encoding, Malformed, FormatDetection and Decode variants.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error raised by a decoder implementation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while fetching, normalizing, detecting or decoding a feed.
///
/// Callers distinguish cases through the message text; the variants exist so that
/// code inside this workspace can match on the failing stage.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Connection, TLS, timeout or redirect-limit failure, or an HTTP error status.
    #[error("{0}")]
    Transport(String),

    /// The declared charset is unknown or the body is not valid in it.
    #[error("{0}")]
    Encoding(String),

    /// The input produced no document tree or no root element.
    #[error("{0}")]
    Malformed(String),

    /// The root element does not identify a supported format.
    #[error("{0}")]
    FormatDetection(String),

    /// Raised by a decoder; shown unchanged.
    #[error(transparent)]
    Decode(BoxError),
}

impl FeedError {
    /// Creates a Transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        FeedError::Transport(msg.into())
    }

    /// Creates an Encoding error with the given message.
    pub fn encoding(msg: impl Into<String>) -> Self {
        FeedError::Encoding(msg.into())
    }

    /// Creates a Malformed error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        FeedError::Malformed(msg.into())
    }

    /// Creates a FormatDetection error with the given message.
    pub fn format_detection(msg: impl Into<String>) -> Self {
        FeedError::FormatDetection(msg.into())
    }

    /// Wraps any decoder error.
    pub fn decode(err: impl Into<BoxError>) -> Self {
        FeedError::Decode(err.into())
    }

    /// Builds a Transport error from an error and its source chain.
    pub fn from_transport_error(err: &(dyn StdError + 'static)) -> Self {
        FeedError::Transport(error_chain(err))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FeedError::Transport(_))
    }

    pub fn is_encoding(&self) -> bool {
        matches!(self, FeedError::Encoding(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, FeedError::Malformed(_))
    }

    pub fn is_format_detection(&self) -> bool {
        matches!(self, FeedError::FormatDetection(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FeedError::Decode(_))
    }
}

/// Joins an error and all of its sources with ": ".
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut msg = err.to_string();
    let mut current = err.source();
    while let Some(src) = current {
        let text = src.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        current = src.source();
    }
    msg
}

/// Plain-text decoder error, for decoders that have nothing richer to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for DecodeError {}
