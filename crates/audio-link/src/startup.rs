//! Startup unmute worker
//!
//! At boot the amplifier has to be forced into a known, unmuted state. The
//! peripheral may not be listening yet, and nothing tells us when it is, so
//! the worker keeps retrying on a fixed backoff until one attempt goes
//! through. There is deliberately no retry limit.
//!
//! Once an attempt succeeds the worker latches `Done` and every later tick is
//! a no-op: the unmute is never repeated and the mute observer is told
//! exactly once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use audio_protocol::PaState;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::AudioLink;
use crate::hooks::AmpDriver;

/// Timing of the startup worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Delay before the first attempt (ms)
    pub initial_delay_ms: u64,
    /// Delay between failed attempts (ms)
    pub retry_delay_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            retry_delay_ms: 1000,
        }
    }
}

impl StartupConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Worker progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not yet succeeded
    Pending {
        /// Attempts made so far
        attempts: u32,
    },
    /// Succeeded; terminal
    Done,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// This tick unmuted the amplifier
    Succeeded,
    /// This tick failed; try again later
    Failed,
    /// An earlier tick already succeeded; nothing was done
    AlreadyDone,
}

/// Deferred, self-rescheduling unmute task
pub struct StartupWorker {
    link: Arc<AudioLink>,
    driver: Arc<dyn AmpDriver>,
    config: StartupConfig,
    state: Mutex<WorkerState>,
}

impl std::fmt::Debug for StartupWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupWorker")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("driver", &"<driver>")
            .finish()
    }
}

impl StartupWorker {
    /// Create a worker using the link's configured timing
    pub fn new(link: Arc<AudioLink>, driver: Arc<dyn AmpDriver>) -> Self {
        let config = link.config().startup.clone();
        Self::with_config(link, driver, config)
    }

    pub fn with_config(
        link: Arc<AudioLink>,
        driver: Arc<dyn AmpDriver>,
        config: StartupConfig,
    ) -> Self {
        Self {
            link,
            driver,
            config,
            state: Mutex::new(WorkerState::Pending { attempts: 0 }),
        }
    }

    /// Current progress
    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_done(&self) -> bool {
        self.state() == WorkerState::Done
    }

    /// Run one attempt
    ///
    /// The state lock is held for the whole attempt so that overlapping
    /// ticks cannot both unmute. Nothing in an attempt blocks: the set
    /// request is fire-and-forget.
    pub fn tick(&self) -> TickOutcome {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let attempts = match *state {
            WorkerState::Done => return TickOutcome::AlreadyDone,
            WorkerState::Pending { attempts } => attempts + 1,
        };

        self.driver.enable_power(true);
        match self.link.set_pa_state(PaState::Unmute) {
            Ok(()) => {
                *state = WorkerState::Done;
                drop(state);
                info!("Amplifier unmuted after {} attempt(s)", attempts);
                self.driver.notify_mute_state(false);
                TickOutcome::Succeeded
            }
            Err(e) => {
                *state = WorkerState::Pending { attempts };
                error!("Startup unmute failed (attempt {}): {}", attempts, e);
                TickOutcome::Failed
            }
        }
    }

    /// Drive the worker until it succeeds or `shutdown` is cancelled
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut delay = self.config.initial_delay();
        debug!("Startup worker scheduled in {:?}", delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Startup worker cancelled before completing");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.tick() {
                TickOutcome::Succeeded | TickOutcome::AlreadyDone => return,
                TickOutcome::Failed => {
                    delay = self.config.retry_delay();
                    debug!("Startup worker rescheduled in {:?}", delay);
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(shutdown))
    }
}
