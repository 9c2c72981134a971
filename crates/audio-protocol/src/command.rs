//! Identifiers and values exchanged with the audio peripheral
//!
//! Every quantity the peripheral knows about is addressed by an [`AudioId`].
//! Replies carry no per-request token, so the identifier is the only thing a
//! reply can be correlated with.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Raw value reported for a PA state that has not been read yet
pub const PA_STATE_INVALID: u8 = 0xFF;

/// Identifier of a quantity held by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AudioId {
    /// Diagnostic mode (local only, never sent)
    Debug = 0,
    /// Power amplifier mute state
    PaState = 1,
    /// Chime cue pushed by the peripheral
    Chime = 2,
    /// Clip/overrun status of the amplifier path
    ClipOverrun = 3,
}

impl AudioId {
    /// All identifiers, in raw order
    pub const ALL: [AudioId; 4] = [
        AudioId::Debug,
        AudioId::PaState,
        AudioId::Chime,
        AudioId::ClipOverrun,
    ];

    /// Decode a raw identifier
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Debug),
            1 => Some(Self::PaState),
            2 => Some(Self::Chime),
            3 => Some(Self::ClipOverrun),
            _ => None,
        }
    }

    /// Raw identifier value
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// Whether the peripheral answers a get request for this identifier
    ///
    /// Chime cues are pushed unsolicited and the debug mode never leaves the
    /// host, so only these two take part in request/reply correlation.
    pub fn is_queryable(self) -> bool {
        matches!(self, Self::PaState | Self::ClipOverrun)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::PaState => "pa_state",
            Self::Chime => "chime",
            Self::ClipOverrun => "clip_overrun",
        }
    }
}

impl fmt::Display for AudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Power amplifier mute state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PaState {
    /// Amplifier output muted
    Mute = 0,
    /// Amplifier output live
    Unmute = 1,
}

impl PaState {
    /// Interpret any non-zero value as unmuted
    pub fn from_flag(value: i32) -> Self {
        if value != 0 {
            Self::Unmute
        } else {
            Self::Mute
        }
    }

    /// Raw wire value
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// Raw value of an optional state, using the invalid sentinel for `None`
    pub fn raw_or_invalid(state: Option<Self>) -> u8 {
        state.map_or(PA_STATE_INVALID, Self::as_raw)
    }
}

impl TryFrom<i32> for PaState {
    type Error = ParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Mute),
            1 => Ok(Self::Unmute),
            other => Err(ParseError::InvalidPaState(other)),
        }
    }
}

/// Audible cue requested by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChimeRequest {
    /// Tone identifier
    pub tone: u8,
    /// Period between repetitions
    pub period: u8,
    /// Number of repetitions
    pub cycle: u8,
    /// Speaker location
    pub location: u8,
}

impl ChimeRequest {
    pub fn new(tone: u8, period: u8, cycle: u8, location: u8) -> Self {
        Self {
            tone,
            period,
            cycle,
            location,
        }
    }
}

impl fmt::Display for ChimeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chime Tone:{}, Period:{}, Cycle:{}, Location:{}",
            self.tone, self.period, self.cycle, self.location
        )
    }
}

/// Diagnostic mode governing whether requests reach the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugMode {
    /// Requests go to the peripheral
    #[default]
    Normal,
    /// Answered locally; replies from the real peripheral are ignored
    SimulateLocal,
    /// Property writes are sent to the peripheral as set requests
    SimulateRemoteSet,
    /// Control-surface writes are applied locally
    SimulateRemoteTest,
}

impl DebugMode {
    /// Integer value used by the property surface
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::SimulateLocal => 1,
            Self::SimulateRemoteSet => 2,
            Self::SimulateRemoteTest => 3,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::SimulateLocal => "Simulate (local)",
            Self::SimulateRemoteSet => "Simulate (remote set)",
            Self::SimulateRemoteTest => "Simulate (remote test)",
        }
    }
}

impl TryFrom<i32> for DebugMode {
    type Error = ParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::SimulateLocal),
            2 => Ok(Self::SimulateRemoteSet),
            3 => Ok(Self::SimulateRemoteTest),
            other => Err(ParseError::UnknownMode(other)),
        }
    }
}

impl FromStr for DebugMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(parse_int(s)?)
    }
}

impl fmt::Display for DebugMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

/// Parse the leading integer of an attribute write
///
/// Attribute writes usually arrive with a trailing newline and may carry
/// extra tokens after the value; only the first token is read. Accepts
/// decimal or `0x`-prefixed hexadecimal.
pub fn parse_int(text: &str) -> Result<i32, ParseError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::InvalidInteger(text.to_string()))?;

    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let invalid = || ParseError::InvalidInteger(text.to_string());

    let (radix, digits) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    // One sign only, and only ahead of any radix prefix
    if !digits.bytes().next().is_some_and(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let magnitude = i64::from_str_radix(digits, radix).map_err(|_| invalid())?;
    let value = if negative {
        magnitude.checked_neg().ok_or_else(invalid)?
    } else {
        magnitude
    };
    i32::try_from(value).map_err(|_| invalid())
}
