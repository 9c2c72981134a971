//! Side-effect hooks the link calls out to
//!
//! The amplifier driver and chime playback live outside this crate. The link
//! only needs to poke them, never to wait on them.

use audio_protocol::ChimeRequest;
use tracing::info;

/// Amplifier driver controls used during startup
pub trait AmpDriver: Send + Sync {
    /// Drive the amplifier power/enable line
    fn enable_power(&self, on: bool);

    /// Tell the driver's mute observer about the current mute state
    fn notify_mute_state(&self, muted: bool);
}

/// Plays chime cues pushed by the peripheral
pub trait ChimePlayer: Send + Sync {
    fn play(&self, chime: &ChimeRequest);
}

/// Chime player that only logs the cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChimePlayer;

impl ChimePlayer for NullChimePlayer {
    fn play(&self, chime: &ChimeRequest) {
        info!("Chime requested ({}), no player attached", chime);
    }
}

/// Amplifier driver that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAmpDriver;

impl AmpDriver for NullAmpDriver {
    fn enable_power(&self, on: bool) {
        info!("Amplifier power {}", if on { "on" } else { "off" });
    }

    fn notify_mute_state(&self, muted: bool) {
        info!("Amplifier {}", if muted { "muted" } else { "unmuted" });
    }
}
