//! Error types for the audio link

use std::io;

use audio_protocol::{AudioId, ChannelError, ParseError};
use thiserror::Error;

use crate::property::Property;

/// Errors that can occur while talking to the peripheral
#[derive(Debug, Error)]
pub enum LinkError {
    /// The request could not be handed to the channel
    #[error("I/O error: failed to dispatch request: {0}")]
    Dispatch(#[from] ChannelError),

    /// The wait for a reply was cancelled before the reply arrived
    #[error("interrupted while waiting for {id}")]
    Interrupted {
        /// Identifier that was being queried
        id: AudioId,
    },

    /// Identifier the peripheral never answers a get request for
    #[error("{0} cannot be queried")]
    NotQueryable(AudioId),

    /// Malformed value written by a caller
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Property has no write accessor
    #[error("property {0} is read-only")]
    ReadOnly(Property),

    /// Control command code that is not handled
    #[error("control command 0x{0:04X} is not supported")]
    UnsupportedCommand(u32),

    /// Control payload buffer too small
    #[error("payload buffer too small: need {needed} bytes, got {got}")]
    BadBuffer {
        /// Bytes required
        needed: usize,
        /// Bytes provided
        got: usize,
    },

    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl LinkError {
    /// Whether this error only reports a cancelled wait
    ///
    /// Callers can retry or propagate these without treating the peripheral
    /// as faulty.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

impl From<LinkError> for io::Error {
    fn from(err: LinkError) -> Self {
        let kind = match &err {
            LinkError::Dispatch(_) => io::ErrorKind::Other,
            LinkError::Interrupted { .. } => io::ErrorKind::Interrupted,
            LinkError::InvalidInput(_) | LinkError::Parse(_) | LinkError::ReadOnly(_) => {
                io::ErrorKind::InvalidInput
            }
            LinkError::UnsupportedCommand(_) | LinkError::NotQueryable(_) => {
                io::ErrorKind::Unsupported
            }
            LinkError::BadBuffer { .. } => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;
