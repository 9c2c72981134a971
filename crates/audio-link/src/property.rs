//! Text property surface
//!
//! Exposes the link as a handful of named attributes that are read and
//! written as text, in the style of sysfs attribute files.

use std::fmt;
use std::str::FromStr;

use audio_protocol::{parse_int, AudioId, DebugMode, Notification, PaState, ParseError, Update};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::engine::AudioLink;
use crate::error::{LinkError, Result};

/// Named attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Debug,
    PaState,
    Chime,
}

impl Property {
    pub const ALL: [Property; 3] = [Property::Debug, Property::PaState, Property::Chime];

    /// Attribute file name
    pub fn name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::PaState => "pa_state",
            Self::Chime => "chime",
        }
    }

    /// Identifier backing this attribute
    pub fn id(self) -> AudioId {
        match self {
            Self::Debug => AudioId::Debug,
            Self::PaState => AudioId::PaState,
            Self::Chime => AudioId::Chime,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| ParseError::UnknownProperty(s.to_string()))
    }
}

impl AudioLink {
    /// Read an attribute
    ///
    /// Reading `pa_state` queries the peripheral first; a failed query
    /// renders as `failed` rather than an error, matching what an attribute
    /// reader expects to see.
    pub async fn show(&self, property: Property, interrupt: &CancellationToken) -> String {
        debug!(%property, "show");
        match property {
            Property::Debug => format!("debug mode:{}\n", self.mode()),
            Property::PaState => match self.query(AudioId::PaState, interrupt).await {
                Ok(()) => format!(
                    "PA State:0x{:x}\n",
                    PaState::raw_or_invalid(self.pa_state())
                ),
                Err(e) => {
                    debug!("pa_state read failed: {}", e);
                    "failed\n".to_string()
                }
            },
            Property::Chime => match self.chime() {
                Some(chime) => format!("{}\n", chime),
                None => "invalid attr\n".to_string(),
            },
        }
    }

    /// Write an attribute, returning the number of bytes consumed
    ///
    /// Writing `pa_state` in [`DebugMode::SimulateRemoteSet`] sends a set
    /// request to the peripheral. In every other mode the value is applied
    /// locally, as if the peripheral had reported it.
    pub fn store(&self, property: Property, text: &str) -> Result<usize> {
        debug!(%property, input = text.trim_end(), "store");
        match property {
            Property::Debug => {
                let value = parse_int(text).map_err(invalid_input)?;
                let mode = DebugMode::try_from(value).map_err(invalid_input)?;
                self.set_mode(mode);
            }
            Property::PaState => {
                let value = parse_int(text).map_err(invalid_input)?;
                if self.mode() == DebugMode::SimulateRemoteSet {
                    // Truncated to a byte, exactly what the peripheral takes
                    self.send_set(AudioId::PaState, [value as u8])?;
                } else {
                    self.on_reply(Notification::simulated(Update::PaState(
                        PaState::from_flag(value),
                    )));
                }
            }
            Property::Chime => return Err(LinkError::ReadOnly(property)),
        }
        Ok(text.len())
    }
}

fn invalid_input(err: ParseError) -> LinkError {
    error!("invalid input param: {}", err);
    LinkError::InvalidInput(err.to_string())
}
