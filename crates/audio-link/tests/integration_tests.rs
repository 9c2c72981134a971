//! Integration tests for the audio link
//!
//! These tests drive the link end to end against a virtual peripheral:
//! - Request/reply correlation, including replies that race ahead of the wait
//! - Interruption and its race with a reply that has just landed
//! - Concurrent queries for different identifiers
//! - The startup unmute worker's retry schedule
//! - Property and control surfaces in each debug mode

use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use audio_link::{
    link_channels, run_notification_pump, AudioLink, LinkConfig, LinkError, Property,
    StartupConfig, StartupWorker, TickOutcome, Transport, WorkerState,
};
use audio_protocol::{
    AudioId, ChannelError, ChimeRequest, ControlCommand, DebugMode, Notification, PaState,
    Request, Update,
};
use audio_sim::{
    run_virtual_peripheral_task, AmpCall, BlackholeTransport, FlakyTransport, RecordingAmpDriver,
    RecordingChimePlayer, VirtualPeripheral, VirtualPeripheralCommand, VirtualPeripheralConfig,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// A link wired to a virtual peripheral task and a notification pump
    pub struct Harness {
        pub link: Arc<AudioLink>,
        pub player: Arc<RecordingChimePlayer>,
        pub peripheral_tx: mpsc::Sender<VirtualPeripheralCommand>,
        pub shutdown: CancellationToken,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.shutdown.cancel();
        }
    }

    pub fn harness(peripheral: VirtualPeripheralConfig, reply_delay: Duration) -> Harness {
        let (transport, notification_rx, ends) = link_channels(32);
        let player = Arc::new(RecordingChimePlayer::new());
        let link = Arc::new(AudioLink::with_config(
            transport,
            player.clone(),
            LinkConfig::default(),
        ));
        let (peripheral_tx, peripheral_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_virtual_peripheral_task(
            VirtualPeripheral::new(peripheral),
            ends,
            peripheral_rx,
            reply_delay,
            shutdown.clone(),
        ));
        tokio::spawn(run_notification_pump(
            link.clone(),
            notification_rx,
            shutdown.clone(),
        ));

        Harness {
            link,
            player,
            peripheral_tx,
            shutdown,
        }
    }

    pub fn unmuted_peripheral() -> VirtualPeripheralConfig {
        VirtualPeripheralConfig {
            pa_state: PaState::Unmute,
            clip_status: true,
            boot_requests: 0,
        }
    }

    /// Transport that answers inside `send`, before the caller can start waiting
    pub struct LoopbackTransport {
        pub peripheral: Mutex<VirtualPeripheral>,
        pub link: OnceLock<Weak<AudioLink>>,
    }

    impl Transport for LoopbackTransport {
        fn send(&self, request: Request) -> Result<(), ChannelError> {
            let link = self
                .link
                .get()
                .and_then(Weak::upgrade)
                .ok_or(ChannelError::Closed)?;
            let replies = self
                .peripheral
                .lock()
                .map_err(|_| ChannelError::Rejected("peripheral poisoned".into()))?
                .process(request);
            for reply in replies {
                link.on_reply(reply);
            }
            Ok(())
        }
    }

    pub fn loopback_link(config: VirtualPeripheralConfig) -> Arc<AudioLink> {
        let transport = Arc::new(LoopbackTransport {
            peripheral: Mutex::new(VirtualPeripheral::new(config)),
            link: OnceLock::new(),
        });
        let link = Arc::new(AudioLink::new(transport.clone()));
        let _ = transport.link.set(Arc::downgrade(&link));
        link
    }

    /// Give spawned tasks a chance to pick up queued commands
    pub async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    /// Wait until a query for `id` has been dispatched and is waiting
    pub async fn wait_until_pending(link: &AudioLink, id: AudioId) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !link.is_pending(id) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("query never became pending");
    }
}

// ============================================================================
// Correlation Tests
// ============================================================================

mod correlation_tests {
    use super::*;

    #[tokio::test]
    async fn pa_state_query_reads_reply() {
        let h = helpers::harness(helpers::unmuted_peripheral(), Duration::from_millis(5));
        let token = CancellationToken::new();

        h.link.query(AudioId::PaState, &token).await.unwrap();

        assert_eq!(h.link.pa_state(), Some(PaState::Unmute));
        assert!(!h.link.is_pending(AudioId::PaState));
    }

    #[tokio::test]
    async fn reply_racing_ahead_of_wait_does_not_deadlock() {
        for id in [AudioId::PaState, AudioId::ClipOverrun] {
            let link = helpers::loopback_link(helpers::unmuted_peripheral());
            let token = CancellationToken::new();

            let result =
                tokio::time::timeout(Duration::from_millis(200), link.query(id, &token)).await;

            assert!(result.is_ok(), "query for {} deadlocked", id);
            assert!(result.unwrap().is_ok());
            assert!(!link.is_pending(id));
        }
    }

    #[tokio::test]
    async fn interrupt_with_reply_already_landed_succeeds() {
        for id in [AudioId::PaState, AudioId::ClipOverrun] {
            let (transport, _notification_rx, _ends) = link_channels(8);
            let link = Arc::new(AudioLink::new(transport));
            let token = CancellationToken::new();

            let query = {
                let link = link.clone();
                let token = token.clone();
                tokio::spawn(async move { link.query(id, &token).await })
            };
            helpers::wait_until_pending(&link, id).await;

            // Reply and interruption land together, before the waiter runs again
            let update = match id {
                AudioId::PaState => Update::PaState(PaState::Mute),
                _ => Update::ClipOverrun(false),
            };
            link.on_reply(Notification::from_peripheral(update));
            token.cancel();

            let result = query.await.unwrap();
            assert!(result.is_ok(), "expected success, got {:?}", result);
        }
    }

    #[tokio::test]
    async fn interrupt_with_lost_reply_is_reported() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        h.peripheral_tx
            .send(VirtualPeripheralCommand::DropReplies(1))
            .await
            .unwrap();
        helpers::settle().await;
        let token = CancellationToken::new();

        let query = {
            let link = h.link.clone();
            let token = token.clone();
            tokio::spawn(async move { link.query(AudioId::PaState, &token).await })
        };
        helpers::wait_until_pending(&h.link, AudioId::PaState).await;
        token.cancel();

        let err = query.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            LinkError::Interrupted {
                id: AudioId::PaState
            }
        ));
        assert!(!h.link.is_pending(AudioId::PaState));

        // The link is still usable after a lost reply
        let fresh = CancellationToken::new();
        assert_eq!(
            h.link.query_pa_state(&fresh).await.unwrap(),
            Some(PaState::Mute)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_queries_for_different_ids() {
        let h = helpers::harness(helpers::unmuted_peripheral(), Duration::from_millis(10));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pa = {
                let link = h.link.clone();
                tokio::spawn(async move {
                    link.query_pa_state(&CancellationToken::new()).await
                })
            };
            let clip = {
                let link = h.link.clone();
                tokio::spawn(async move {
                    link.query_clip_overrun(&CancellationToken::new()).await
                })
            };
            handles.push((pa, clip));
        }

        for (pa, clip) in handles {
            assert_eq!(pa.await.unwrap().unwrap(), Some(PaState::Unmute));
            assert_eq!(clip.await.unwrap().unwrap(), Some(true));
        }
        assert!(!h.link.is_pending(AudioId::PaState));
        assert!(!h.link.is_pending(AudioId::ClipOverrun));
    }

    #[tokio::test]
    async fn duplicate_replies_are_harmless() {
        let h = helpers::harness(helpers::unmuted_peripheral(), Duration::ZERO);
        h.peripheral_tx
            .send(VirtualPeripheralCommand::DuplicateReplies(true))
            .await
            .unwrap();
        helpers::settle().await;
        let token = CancellationToken::new();

        for _ in 0..3 {
            assert_eq!(
                h.link.query_clip_overrun(&token).await.unwrap(),
                Some(true)
            );
        }
        // Let the trailing duplicate drain
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!h.link.is_pending(AudioId::ClipOverrun));
    }

    #[tokio::test]
    async fn closed_channel_reports_dispatch_error() {
        let (transport, _notification_rx, ends) = link_channels(8);
        drop(ends);
        let link = AudioLink::new(transport);

        let err = link
            .query(AudioId::PaState, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Dispatch(ChannelError::Closed)));
        assert!(!err.is_interrupted());
        assert!(!link.is_pending(AudioId::PaState));
    }

    #[tokio::test]
    async fn simulate_modes_never_dispatch() {
        for mode in [
            DebugMode::SimulateLocal,
            DebugMode::SimulateRemoteSet,
            DebugMode::SimulateRemoteTest,
        ] {
            let transport = Arc::new(FlakyTransport::new(BlackholeTransport, 0));
            let link = AudioLink::new(transport.clone());
            link.set_mode(mode);

            link.query(AudioId::PaState, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(transport.attempts(), 0);
        }
    }
}

// ============================================================================
// Dispatcher Tests
// ============================================================================

mod dispatcher_tests {
    use super::*;

    #[tokio::test]
    async fn chime_push_reaches_player() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        let chime = ChimeRequest::new(7, 3, 2, 1);
        h.peripheral_tx
            .send(VirtualPeripheralCommand::Chime(chime))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while h.player.played().is_empty() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(h.player.played(), vec![chime]);
        assert_eq!(h.link.chime(), Some(chime));
    }

    #[tokio::test]
    async fn unknown_push_is_discarded() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        let before = h.link.snapshot();
        h.peripheral_tx
            .send(VirtualPeripheralCommand::PushUnknown(0x42))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.link.snapshot(), before);
    }

    #[tokio::test]
    async fn simulate_local_ignores_real_peripheral() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        h.link.store(Property::Debug, "1\n").unwrap();
        h.link.store(Property::PaState, "1\n").unwrap();

        h.peripheral_tx
            .send(VirtualPeripheralCommand::SetClipStatus(true))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.link.pa_state(), Some(PaState::Unmute));
        assert_eq!(h.link.clip_status(), None);
    }
}

// ============================================================================
// Startup Worker Tests
// ============================================================================

mod startup_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn two_failures_then_success() {
        let transport = Arc::new(FlakyTransport::new(BlackholeTransport, 2));
        let link = Arc::new(AudioLink::new(transport.clone()));
        let driver = Arc::new(RecordingAmpDriver::new());
        let worker = Arc::new(StartupWorker::with_config(
            link,
            driver.clone(),
            StartupConfig::default(),
        ));

        let start = tokio::time::Instant::now();
        worker.spawn(CancellationToken::new()).await.unwrap();

        let offsets: Vec<_> = transport
            .attempt_times()
            .iter()
            .map(|t| t.duration_since(start))
            .collect();
        assert_eq!(
            offsets,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1500),
                Duration::from_millis(2500),
            ]
        );
        assert_eq!(worker.state(), WorkerState::Done);
        assert_eq!(driver.unmute_notifications(), 1);
        assert_eq!(
            transport.delivered(),
            vec![Request::set(AudioId::PaState, [PaState::Unmute.as_raw()])]
        );

        // A tick that was already queued does nothing
        assert_eq!(worker.tick(), TickOutcome::AlreadyDone);
        assert_eq!(transport.attempts(), 3);
        assert_eq!(driver.unmute_notifications(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn power_enabled_before_each_attempt() {
        let transport = Arc::new(FlakyTransport::new(BlackholeTransport, 1));
        let link = Arc::new(AudioLink::new(transport.clone()));
        let driver = Arc::new(RecordingAmpDriver::new());
        let worker = Arc::new(StartupWorker::new(link, driver.clone()));

        worker.spawn(CancellationToken::new()).await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                AmpCall::EnablePower(true),
                AmpCall::EnablePower(true),
                AmpCall::MuteState(false),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unmute_reaches_peripheral() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        let driver = Arc::new(RecordingAmpDriver::new());
        let worker = Arc::new(StartupWorker::new(h.link.clone(), driver.clone()));

        worker.spawn(h.shutdown.clone()).await.unwrap();
        assert!(worker.is_done());

        // The peripheral echoes the new state back
        let token = CancellationToken::new();
        assert_eq!(
            h.link.query_pa_state(&token).await.unwrap(),
            Some(PaState::Unmute)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_retrying() {
        let transport = Arc::new(FlakyTransport::new(BlackholeTransport, usize::MAX));
        let link = Arc::new(AudioLink::new(transport.clone()));
        let worker = Arc::new(StartupWorker::new(
            link,
            Arc::new(RecordingAmpDriver::new()),
        ));
        let shutdown = CancellationToken::new();
        let handle = worker.spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let attempts = transport.attempts();
        assert_eq!(attempts, 10);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(transport.attempts(), attempts);
        assert_eq!(worker.state(), WorkerState::Pending { attempts: 10 });
    }
}

// ============================================================================
// Surface Tests
// ============================================================================

mod surface_tests {
    use super::*;

    #[tokio::test]
    async fn debug_property_round_trip() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        let token = CancellationToken::new();

        for mode in [
            DebugMode::SimulateRemoteTest,
            DebugMode::SimulateLocal,
            DebugMode::Normal,
        ] {
            h.link
                .store(Property::Debug, &format!("{}\n", mode))
                .unwrap();
            let shown = h.link.show(Property::Debug, &token).await;
            let value = shown.trim().trim_start_matches("debug mode:");
            assert_eq!(value.parse::<DebugMode>().unwrap(), mode);
        }
    }

    #[tokio::test]
    async fn simulate_local_property_write() {
        let transport = Arc::new(FlakyTransport::new(BlackholeTransport, 0));
        let link = AudioLink::new(transport.clone());

        link.store(Property::Debug, "1").unwrap();
        link.store(Property::PaState, "1").unwrap();

        assert_eq!(transport.attempts(), 0);
        assert_eq!(link.pa_state(), Some(PaState::Unmute));
    }

    #[tokio::test]
    async fn pa_state_property_reads_peripheral() {
        let h = helpers::harness(helpers::unmuted_peripheral(), Duration::ZERO);
        let token = CancellationToken::new();
        assert_eq!(
            h.link.show(Property::PaState, &token).await,
            "PA State:0x1\n"
        );
    }

    #[tokio::test]
    async fn pa_state_property_reports_failure() {
        let (transport, _notification_rx, ends) = link_channels(8);
        drop(ends);
        let link = AudioLink::new(transport);
        assert_eq!(
            link.show(Property::PaState, &CancellationToken::new()).await,
            "failed\n"
        );
    }

    #[tokio::test]
    async fn remote_set_property_reaches_peripheral() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        h.link.store(Property::Debug, "2").unwrap();
        h.link.store(Property::PaState, "1").unwrap();

        // The peripheral pushes its new state back
        tokio::time::timeout(Duration::from_secs(1), async {
            while h.link.pa_state() != Some(PaState::Unmute) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn control_get_clip_overrun() {
        let h = helpers::harness(helpers::unmuted_peripheral(), Duration::ZERO);
        let mut arg = [0u8; 4];

        h.link
            .handle_control(
                ControlCommand::GetClipOverrun.code(),
                &mut arg,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(i32::from_le_bytes(arg), 1);
    }

    #[tokio::test]
    async fn control_set_then_get_pa_state() {
        let h = helpers::harness(VirtualPeripheralConfig::default(), Duration::ZERO);
        let token = CancellationToken::new();

        let mut arg = 1i32.to_le_bytes();
        h.link
            .handle_control(ControlCommand::SetPaState.code(), &mut arg, &token)
            .await
            .unwrap();

        let mut out = [0u8; 4];
        h.link
            .handle_control(ControlCommand::GetPaState.code(), &mut out, &token)
            .await
            .unwrap();
        assert_eq!(i32::from_le_bytes(out), 1);
    }
}
