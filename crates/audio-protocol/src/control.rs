//! Binary control-surface command codes
//!
//! Codes follow the `_IO(type, nr)` layout: the type byte in bits 8..16 and
//! the command number in bits 0..8. Every command exchanges a single 4-byte
//! little-endian integer.

use crate::error::ParseError;

/// Type byte shared by all audio control commands
pub const CONTROL_MAGIC: u8 = b'a';

/// Size of every control payload
pub const CONTROL_PAYLOAD_LEN: usize = 4;

/// Command accepted by the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlCommand {
    GetPaState,
    SetPaState,
    GetClipOverrun,
    SetClipOverrun,
}

impl ControlCommand {
    /// Command number within the audio type
    pub fn nr(self) -> u8 {
        match self {
            Self::GetPaState => 0x01,
            Self::SetPaState => 0x02,
            Self::GetClipOverrun => 0x03,
            Self::SetClipOverrun => 0x04,
        }
    }

    /// Full command code
    pub fn code(self) -> u32 {
        ((CONTROL_MAGIC as u32) << 8) | self.nr() as u32
    }

    /// Decode a full command code
    pub fn from_code(code: u32) -> Result<Self, ParseError> {
        if (code >> 8) & 0xFF != CONTROL_MAGIC as u32 || code >> 16 != 0 {
            return Err(ParseError::UnknownCommand(code));
        }
        match code & 0xFF {
            0x01 => Ok(Self::GetPaState),
            0x02 => Ok(Self::SetPaState),
            0x03 => Ok(Self::GetClipOverrun),
            0x04 => Ok(Self::SetClipOverrun),
            _ => Err(ParseError::UnknownCommand(code)),
        }
    }

    /// Whether the command writes its result into the payload
    pub fn is_get(self) -> bool {
        matches!(self, Self::GetPaState | Self::GetClipOverrun)
    }
}

/// Encode a control payload value
pub fn encode_value(value: i32) -> [u8; CONTROL_PAYLOAD_LEN] {
    value.to_le_bytes()
}

/// Decode a control payload value, if the buffer is long enough
pub fn decode_value(buf: &[u8]) -> Option<i32> {
    let bytes: [u8; CONTROL_PAYLOAD_LEN] = buf.get(..CONTROL_PAYLOAD_LEN)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}
