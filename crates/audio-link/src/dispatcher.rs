//! Notification dispatcher
//!
//! Applies asynchronous deliveries from the peripheral to the shared state
//! and releases whichever query was waiting on them. State is written before
//! the pending bit is cleared, so a woken caller always reads the new value.

use std::sync::Arc;

use audio_protocol::{AudioId, DebugMode, Notification, Update};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::AudioLink;

impl AudioLink {
    /// Apply a notification from the peripheral
    ///
    /// Chime cues are handed to the chime player and never touch the
    /// pending table; nothing waits on them. Unknown identifiers are logged
    /// and dropped.
    pub fn on_reply(&self, notification: Notification) {
        let id = {
            let mut state = self.lock_state();

            if state.mode == DebugMode::SimulateLocal && !notification.is_simulated() {
                info!(
                    id = notification.update.raw_id(),
                    "under simulate mode, ignoring peripheral notification"
                );
                return;
            }

            match notification.update {
                Update::PaState(pa_state) => {
                    debug!("PA State: {:?}", pa_state);
                    state.pa_state = Some(pa_state);
                    AudioId::PaState
                }
                Update::ClipOverrun(clipping) => {
                    debug!("Clip overrun status: {}", clipping);
                    state.clip_status = Some(clipping);
                    AudioId::ClipOverrun
                }
                Update::Chime(chime) => {
                    debug!("{}", chime);
                    state.chime = Some(chime);
                    drop(state);
                    self.chime_player.play(&chime);
                    return;
                }
                Update::Unknown { id } => {
                    error!("invalid notification (id: 0x{:02X})", id);
                    return;
                }
            }
        };

        if self.pending.clear_and_wake(id) {
            debug!(%id, "woke pending query");
        }
    }
}

/// Feed notifications from the peripheral into the dispatcher
///
/// Returns when the notification channel closes or `shutdown` is cancelled.
pub async fn run_notification_pump(
    link: Arc<AudioLink>,
    mut notification_rx: mpsc::Receiver<Notification>,
    shutdown: CancellationToken,
) {
    info!("Notification pump starting");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break;
            }

            notification = notification_rx.recv() => {
                match notification {
                    Some(notification) => link.on_reply(notification),
                    None => {
                        debug!("Notification channel closed");
                        break;
                    }
                }
            }
        }
    }

    info!("Notification pump shutting down");
}
