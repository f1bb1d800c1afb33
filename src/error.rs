//! Error types for transcoding operations
//!
//! Every failure in this crate degrades to best-effort original content
//! rather than propagating upward; nothing here is fatal to the hosting
//! proxy. The variants map onto the recovery rules the pipeline applies:
//!
//! - `Decode` (markup or image bytes) -> pass the prior-stage input through
//! - `Fetch` (transport failure) -> failure marker, nothing cached
//! - `Encode` (target format failure) -> original bytes, nothing cached
//! - `Storage` (cache write failure) -> failure marker, request survives

use std::fmt;

/// Errors that can occur while transcoding content for legacy clients
#[derive(Debug)]
pub enum TranscodeError {
    /// HTML parsing failed
    Parse(String),
    /// Character encoding error
    Encoding(String),
    /// Bytes could not be decoded as an image
    Decode(String),
    /// Transport failure while retrieving a resource
    Fetch(String),
    /// Target image format could not be encoded
    Encode(String),
    /// Cache artifact could not be persisted
    Storage(std::io::Error),
    /// Invalid input data
    InvalidInput(String),
    /// Invalid configuration (e.g. an inconsistent conversion table)
    Config(String),
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscodeError::Parse(msg) => write!(f, "Parse error: {}", msg),
            TranscodeError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            TranscodeError::Decode(msg) => write!(f, "Image decode error: {}", msg),
            TranscodeError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            TranscodeError::Encode(msg) => write!(f, "Image encode error: {}", msg),
            TranscodeError::Storage(err) => write!(f, "Cache storage error: {}", err),
            TranscodeError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            TranscodeError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TranscodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TranscodeError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TranscodeError {
    fn from(err: std::io::Error) -> Self {
        TranscodeError::Storage(err)
    }
}
