//! Channel to the peripheral
//!
//! Sending is fire-and-forget: [`Transport::send`] hands a request over and
//! returns. Answers come back separately as [`Notification`]s, which the
//! notification pump feeds into the dispatcher.

use std::sync::Arc;

use audio_protocol::{ChannelError, Notification, Request};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Outbound half of the peripheral channel
pub trait Transport: Send + Sync {
    /// Hand a request to the channel without waiting for an answer
    fn send(&self, request: Request) -> Result<(), ChannelError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> Result<(), ChannelError> {
        (**self).send(request)
    }
}

/// [`Transport`] backed by a tokio mpsc queue
///
/// Whatever owns the receiving end (a serial bridge, a virtual peripheral)
/// delivers the request.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    request_tx: mpsc::Sender<Request>,
}

impl ChannelTransport {
    pub fn new(request_tx: mpsc::Sender<Request>) -> Self {
        Self { request_tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, request: Request) -> Result<(), ChannelError> {
        debug!(id = %request.id, op = ?request.op, "dispatching request");
        self.request_tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::Busy,
            TrySendError::Closed(_) => ChannelError::Closed,
        })
    }
}

/// Peripheral-side ends of a link's channels
#[derive(Debug)]
pub struct PeripheralEnds {
    /// Requests dispatched by the link
    pub request_rx: mpsc::Receiver<Request>,
    /// Where the peripheral delivers notifications
    pub notification_tx: mpsc::Sender<Notification>,
}

/// Create the request and notification channels for a link
///
/// Returns the transport for the link, the receiver for its notification
/// pump, and the ends the peripheral side holds.
pub fn link_channels(
    capacity: usize,
) -> (ChannelTransport, mpsc::Receiver<Notification>, PeripheralEnds) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (notification_tx, notification_rx) = mpsc::channel(capacity);
    (
        ChannelTransport::new(request_tx),
        notification_rx,
        PeripheralEnds {
            request_rx,
            notification_tx,
        },
    )
}
