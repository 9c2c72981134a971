//! Correlation engine
//!
//! Turns "send a get request, then wait for a notification carrying the same
//! identifier" into a single awaited call. The reply does not come back
//! through the call; it lands in the shared [`AudioState`] via the
//! dispatcher, and [`AudioLink::query`] returns once it has.

use std::sync::{Arc, Mutex, MutexGuard};

use audio_protocol::{AudioId, ChimeRequest, DebugMode, PaState, Request};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{LinkError, Result};
use crate::hooks::{ChimePlayer, NullChimePlayer};
use crate::pending::{Interrupted, PendingGuard, PendingTable};
use crate::startup::StartupConfig;
use crate::state::AudioState;
use crate::transport::Transport;

/// Link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Debug mode the link starts in
    #[serde(default)]
    pub initial_mode: DebugMode,
    /// Startup unmute worker timing
    #[serde(default)]
    pub startup: StartupConfig,
    /// Capacity of the request and notification queues
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    32
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            initial_mode: DebugMode::Normal,
            startup: StartupConfig::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Link to the audio peripheral
///
/// One instance owns the shared state, the pending-request table and the
/// outbound transport. It is built once at startup and shared by reference
/// (`Arc<AudioLink>`) between callers, the notification pump and the startup
/// worker.
pub struct AudioLink {
    config: LinkConfig,
    state: Mutex<AudioState>,
    pub(crate) pending: PendingTable,
    /// Serializes every query, across all identifiers
    query_section: tokio::sync::Mutex<()>,
    transport: Box<dyn Transport>,
    pub(crate) chime_player: Arc<dyn ChimePlayer>,
}

impl std::fmt::Debug for AudioLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioLink")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("transport", &"<transport>")
            .field("chime_player", &"<player>")
            .finish()
    }
}

impl AudioLink {
    /// Create a link with default configuration and no chime player
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, Arc::new(NullChimePlayer), LinkConfig::default())
    }

    /// Create a link with custom configuration
    pub fn with_config(
        transport: impl Transport + 'static,
        chime_player: Arc<dyn ChimePlayer>,
        config: LinkConfig,
    ) -> Self {
        info!("Audio link starting in mode {}", config.initial_mode.name());
        Self {
            state: Mutex::new(AudioState::new(config.initial_mode)),
            pending: PendingTable::new(),
            query_section: tokio::sync::Mutex::new(()),
            transport: Box::new(transport),
            chime_player,
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, AudioState> {
        // A panic while holding the lock cannot leave the record half-written:
        // every writer assigns a single field.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AudioState {
        self.lock_state().clone()
    }

    /// Current debug mode
    pub fn mode(&self) -> DebugMode {
        self.lock_state().mode
    }

    /// Switch debug mode
    pub fn set_mode(&self, mode: DebugMode) {
        let previous = std::mem::replace(&mut self.lock_state().mode, mode);
        if previous != mode {
            info!("Debug mode {} -> {}", previous.name(), mode.name());
        }
    }

    /// Last known PA state
    pub fn pa_state(&self) -> Option<PaState> {
        self.lock_state().pa_state
    }

    /// Last known clip/overrun status
    pub fn clip_status(&self) -> Option<bool> {
        self.lock_state().clip_status
    }

    /// Last chime cue
    pub fn chime(&self) -> Option<ChimeRequest> {
        self.lock_state().chime
    }

    /// Whether a query for `id` is waiting on its reply
    pub fn is_pending(&self, id: AudioId) -> bool {
        self.pending.is_pending(id)
    }

    /// Ask the peripheral for `id` and wait until its reply has been applied
    ///
    /// Outside [`DebugMode::Normal`] this returns at once without touching
    /// the channel. Queries are serialized process-wide, so concurrent
    /// callers queue here rather than racing on the shared record.
    ///
    /// Cancelling `interrupt` ends the wait with [`LinkError::Interrupted`],
    /// unless the reply landed at the same time, in which case the query
    /// succeeds. Dropping the returned future also releases the pending bit.
    pub async fn query(&self, id: AudioId, interrupt: &CancellationToken) -> Result<()> {
        if !id.is_queryable() {
            return Err(LinkError::NotQueryable(id));
        }

        let mode = self.mode();
        if mode != DebugMode::Normal {
            debug!(%id, "query answered locally in mode {}", mode.name());
            return Ok(());
        }

        let _section = self.query_section.lock().await;

        let (guard, was_pending) = self.pending.guard(id);
        if was_pending {
            warn!(%id, "query already pending, sharing its reply");
        }

        if let Err(e) = self.transport.send(Request::get(id)) {
            error!(%id, "get request failed: {}", e);
            return Err(LinkError::Dispatch(e));
        }

        let outcome = self.pending.wait_cleared(id, Some(interrupt)).await;
        self.finish_wait(id, guard, outcome)
    }

    /// Turn the end of a wait into the query result
    ///
    /// An interrupted wait still succeeds if the bit has cleared by now: the
    /// reply landed between the interruption and this check.
    fn finish_wait(
        &self,
        id: AudioId,
        guard: PendingGuard<'_>,
        outcome: std::result::Result<(), Interrupted>,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                guard.disarm();
                debug!(%id, "reply received");
                Ok(())
            }
            Err(Interrupted) if !self.pending.is_pending(id) => {
                guard.disarm();
                warn!(%id, "interrupted, but the reply had already been delivered");
                Ok(())
            }
            Err(Interrupted) => {
                error!(%id, "interrupted while waiting for reply");
                Err(LinkError::Interrupted { id })
            }
        }
    }

    /// Query the PA state and return the value the reply left behind
    pub async fn query_pa_state(&self, interrupt: &CancellationToken) -> Result<Option<PaState>> {
        self.query(AudioId::PaState, interrupt).await?;
        Ok(self.pa_state())
    }

    /// Query the clip/overrun status and return the value the reply left behind
    pub async fn query_clip_overrun(&self, interrupt: &CancellationToken) -> Result<Option<bool>> {
        self.query(AudioId::ClipOverrun, interrupt).await?;
        Ok(self.clip_status())
    }

    /// Send a set request without waiting for any reply
    pub fn send_set(&self, id: AudioId, payload: impl Into<Vec<u8>>) -> Result<()> {
        self.transport.send(Request::set(id, payload)).map_err(|e| {
            error!(%id, "set request failed: {}", e);
            LinkError::Dispatch(e)
        })
    }

    /// Ask the peripheral to change the PA state
    pub fn set_pa_state(&self, state: PaState) -> Result<()> {
        self.send_set(AudioId::PaState, [state.as_raw()])
    }
}
