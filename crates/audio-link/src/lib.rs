//! Audio Peripheral Link
//!
//! This crate bridges local callers to a remote audio-control peripheral that
//! only speaks through a fire-and-forget channel: requests go out one way and
//! answers come back later as unsolicited notifications.
//!
//! # Architecture
//!
//! - [`PendingTable`]: one pending bit per identifier plus a wake-up condition
//! - [`AudioLink::query`]: marks the identifier pending, sends the request and
//!   waits until the matching notification has been applied
//! - [`AudioLink::on_reply`]: the notification dispatcher; updates the shared
//!   [`AudioState`], then wakes the waiting query
//! - [`StartupWorker`]: unmutes the amplifier once at boot, retrying until
//!   the peripheral is ready
//! - Property and control surfaces: text and binary front ends over the same
//!   operations
//!
//! Replies carry no request token; correlation is by identifier alone, and
//! all queries are serialized.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use audio_link::{link_channels, run_notification_pump, AudioLink};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> audio_link::Result<()> {
//! let (transport, notification_rx, _peripheral) = link_channels(32);
//! let link = Arc::new(AudioLink::new(transport));
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(run_notification_pump(link.clone(), notification_rx, shutdown.clone()));
//!
//! let pa_state = link.query_pa_state(&CancellationToken::new()).await?;
//! println!("PA state: {:?}", pa_state);
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod pending;
pub mod property;
pub mod startup;
pub mod state;
pub mod transport;

pub use dispatcher::run_notification_pump;
pub use engine::{AudioLink, LinkConfig};
pub use error::{LinkError, Result};
pub use hooks::{AmpDriver, ChimePlayer, NullAmpDriver, NullChimePlayer};
pub use pending::{Interrupted, PendingGuard, PendingTable};
pub use property::Property;
pub use startup::{StartupConfig, StartupWorker, TickOutcome, WorkerState};
pub use state::AudioState;
pub use transport::{link_channels, ChannelTransport, PeripheralEnds, Transport};
