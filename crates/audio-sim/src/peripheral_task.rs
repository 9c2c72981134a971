//! Virtual peripheral actor task
//!
//! This module provides an async task that owns a [`VirtualPeripheral`] and
//! sits on the far side of a link's channels. The task uses a select! loop to:
//! - Read requests dispatched by the link and answer them after a delay
//! - Push chime cues and other scripted commands
//! - Stop on shutdown

use std::time::Duration;

use audio_protocol::{ChimeRequest, Notification};
use audio_link::PeripheralEnds;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::VirtualPeripheral;

/// Commands that can be sent to a virtual peripheral actor
#[derive(Debug, Clone)]
pub enum VirtualPeripheralCommand {
    /// Push a chime cue to the link
    Chime(ChimeRequest),
    /// Change the reported clip/overrun status and push it
    SetClipStatus(bool),
    /// Lose the next `n` replies
    DropReplies(u32),
    /// Deliver every reply twice
    DuplicateReplies(bool),
    /// Deliver a notification for an identifier the link does not know
    PushUnknown(u8),
}

/// Run the virtual peripheral actor task
///
/// Replies are delivered `reply_delay` after the request arrives. Returns
/// when `shutdown` is cancelled, or when the link side of either channel
/// goes away.
pub async fn run_virtual_peripheral_task(
    mut peripheral: VirtualPeripheral,
    ends: PeripheralEnds,
    mut cmd_rx: mpsc::Receiver<VirtualPeripheralCommand>,
    reply_delay: Duration,
    shutdown: CancellationToken,
) {
    let PeripheralEnds {
        mut request_rx,
        notification_tx,
    } = ends;

    info!("Virtual peripheral starting (reply delay {:?})", reply_delay);

    loop {
        let outgoing = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested for virtual peripheral");
                break;
            }

            request = request_rx.recv() => {
                let Some(request) = request else {
                    debug!("Request channel closed for virtual peripheral");
                    break;
                };
                debug!("Virtual peripheral received {:?}", request);
                let replies = peripheral.process(request);
                if !replies.is_empty() && !reply_delay.is_zero() {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(reply_delay) => {}
                    }
                }
                replies
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualPeripheralCommand::Chime(chime)) => vec![peripheral.chime(chime)],
                    Some(VirtualPeripheralCommand::SetClipStatus(clipping)) => {
                        peripheral.set_clip_status(clipping);
                        vec![Notification::from_peripheral(
                            audio_protocol::Update::ClipOverrun(clipping),
                        )]
                    }
                    Some(VirtualPeripheralCommand::DropReplies(n)) => {
                        peripheral.drop_next(n);
                        Vec::new()
                    }
                    Some(VirtualPeripheralCommand::DuplicateReplies(enabled)) => {
                        peripheral.set_duplicate_replies(enabled);
                        Vec::new()
                    }
                    Some(VirtualPeripheralCommand::PushUnknown(id)) => {
                        vec![Notification::from_peripheral(audio_protocol::Update::Unknown { id })]
                    }
                    None => {
                        debug!("Command channel closed for virtual peripheral");
                        break;
                    }
                }
            }
        };

        for notification in outgoing {
            if notification_tx.send(notification).await.is_err() {
                warn!("Notification channel closed, virtual peripheral stopping");
                return;
            }
        }
    }

    info!("Virtual peripheral task ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_link::link_channels;
    use audio_link::Transport;
    use audio_protocol::{AudioId, PaState, Request, Update};

    #[tokio::test]
    async fn test_answers_get_request() {
        let (transport, mut notification_rx, ends) = link_channels(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_virtual_peripheral_task(
            VirtualPeripheral::default(),
            ends,
            cmd_rx,
            Duration::ZERO,
            shutdown.clone(),
        ));

        transport.send(Request::get(AudioId::PaState)).unwrap();
        let reply = tokio::time::timeout(Duration::from_millis(100), notification_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.update, Update::PaState(PaState::Mute));

        drop(cmd_tx);
        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_delay() {
        let (transport, mut notification_rx, ends) = link_channels(8);
        let (_cmd_tx, cmd_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let _task = tokio::spawn(run_virtual_peripheral_task(
            VirtualPeripheral::default(),
            ends,
            cmd_rx,
            Duration::from_millis(200),
            shutdown.clone(),
        ));

        let start = tokio::time::Instant::now();
        transport.send(Request::get(AudioId::ClipOverrun)).unwrap();
        let reply = notification_rx.recv().await.unwrap();
        assert_eq!(reply.update, Update::ClipOverrun(false));
        assert!(start.elapsed() >= Duration::from_millis(200));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_pushes_chime() {
        let (_transport, mut notification_rx, ends) = link_channels(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_virtual_peripheral_task(
            VirtualPeripheral::default(),
            ends,
            cmd_rx,
            Duration::ZERO,
            shutdown.clone(),
        ));

        let chime = ChimeRequest::new(2, 4, 6, 8);
        cmd_tx
            .send(VirtualPeripheralCommand::Chime(chime))
            .await
            .unwrap();
        let pushed = notification_rx.recv().await.unwrap();
        assert_eq!(pushed.update, Update::Chime(chime));

        shutdown.cancel();
        task.await.unwrap();
    }
}
