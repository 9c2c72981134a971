//! Last-known peripheral state

use audio_protocol::{ChimeRequest, DebugMode, PaState};
use serde::{Deserialize, Serialize};

/// Shared record of what the peripheral last reported
///
/// Fields start out unknown. `pa_state` and `clip_status` only become
/// meaningful to a reader once a query for them has completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioState {
    /// Diagnostic mode
    pub mode: DebugMode,
    /// Amplifier mute state
    pub pa_state: Option<PaState>,
    /// Clip/overrun flag on the amplifier path
    pub clip_status: Option<bool>,
    /// Most recent chime cue
    pub chime: Option<ChimeRequest>,
}

impl AudioState {
    /// Create a state record with every field unknown
    pub fn new(mode: DebugMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Format PA state for display
    pub fn pa_state_display(&self) -> String {
        match self.pa_state {
            Some(PaState::Mute) => "Muted".to_string(),
            Some(PaState::Unmute) => "Unmuted".to_string(),
            None => "---".to_string(),
        }
    }

    /// Format clip status for display
    pub fn clip_display(&self) -> String {
        match self.clip_status {
            Some(true) => "Clipping".to_string(),
            Some(false) => "OK".to_string(),
            None => "---".to_string(),
        }
    }
}
