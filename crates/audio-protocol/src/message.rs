//! Requests sent to the peripheral and notifications received from it
//!
//! The two directions are decoupled: a [`Request`] is fire-and-forget, and
//! whatever the peripheral has to say comes back later as a [`Notification`]
//! on a separate path. A notification may answer an earlier get request, or
//! be entirely unsolicited (chime cues, state pushes after a set).

use crate::command::{AudioId, ChimeRequest, PaState};

/// Direction of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestOp {
    /// Ask the peripheral to report a value
    Get,
    /// Ask the peripheral to change a value
    Set,
}

/// Request dispatched to the peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
    pub op: RequestOp,
    pub id: AudioId,
    /// Raw value for set requests, empty for get requests
    pub payload: Vec<u8>,
}

impl Request {
    /// Create a get request
    pub fn get(id: AudioId) -> Self {
        Self {
            op: RequestOp::Get,
            id,
            payload: Vec::new(),
        }
    }

    /// Create a set request
    pub fn set(id: AudioId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            op: RequestOp::Set,
            id,
            payload: payload.into(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.op == RequestOp::Get
    }
}

/// Where a notification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    /// Delivered by the real peripheral
    #[default]
    Peripheral,
    /// Injected by a diagnostic path on the host
    Simulated,
}

/// Value carried by a notification
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Update {
    /// New PA mute state
    PaState(PaState),
    /// New clip/overrun status
    ClipOverrun(bool),
    /// Chime cue to be played
    Chime(ChimeRequest),
    /// Identifier this host does not understand (preserves the raw id)
    Unknown { id: u8 },
}

impl Update {
    /// Identifier this update belongs to, if known
    pub fn id(&self) -> Option<AudioId> {
        match self {
            Self::PaState(_) => Some(AudioId::PaState),
            Self::ClipOverrun(_) => Some(AudioId::ClipOverrun),
            Self::Chime(_) => Some(AudioId::Chime),
            Self::Unknown { .. } => None,
        }
    }

    /// Raw identifier, including unknown ones
    pub fn raw_id(&self) -> u8 {
        match self {
            Self::Unknown { id } => *id,
            other => other.id().map_or(0xFF, AudioId::as_raw),
        }
    }
}

/// Asynchronous delivery from the peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Notification {
    pub update: Update,
    pub origin: Origin,
}

impl Notification {
    /// Notification delivered by the peripheral
    pub fn from_peripheral(update: Update) -> Self {
        Self {
            update,
            origin: Origin::Peripheral,
        }
    }

    /// Notification injected by a diagnostic path
    pub fn simulated(update: Update) -> Self {
        Self {
            update,
            origin: Origin::Simulated,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.origin == Origin::Simulated
    }
}
