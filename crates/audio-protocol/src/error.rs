//! Error types for the audio peripheral protocol

use thiserror::Error;

/// Errors raised while turning text or raw values into protocol types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Debug mode value outside the known set
    #[error("unknown debug mode: {0}")]
    UnknownMode(i32),

    /// PA state value other than mute/unmute
    #[error("invalid PA state: {0}")]
    InvalidPaState(i32),

    /// Property name that is not exposed
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// Control command code that is not recognised
    #[error("unknown control command: 0x{0:04X}")]
    UnknownCommand(u32),

    /// Text that does not hold an integer
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),
}

/// Errors reported by the channel to the peripheral
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel has been torn down
    #[error("channel closed")]
    Closed,

    /// The channel cannot take another request right now
    #[error("channel busy")]
    Busy,

    /// The channel refused the request
    #[error("request rejected: {0}")]
    Rejected(String),
}
