//! Recording hooks and fault-injecting transports
//!
//! Stand-ins for the amplifier driver, the chime player and the peripheral
//! channel that remember what was asked of them, so tests can check exactly
//! which side effects happened and when.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use audio_link::{AmpDriver, ChimePlayer, Transport};
use audio_protocol::{ChannelError, ChimeRequest, Request};
use tokio::time::Instant;
use tracing::debug;

/// Call made on a [`RecordingAmpDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpCall {
    EnablePower(bool),
    MuteState(bool),
}

/// Amplifier driver that records every call
#[derive(Debug, Default)]
pub struct RecordingAmpDriver {
    calls: Mutex<Vec<AmpCall>>,
}

impl RecordingAmpDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls, in order
    pub fn calls(&self) -> Vec<AmpCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of times the mute observer was told the amplifier is unmuted
    pub fn unmute_notifications(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == AmpCall::MuteState(false))
            .count()
    }

    fn record(&self, call: AmpCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl AmpDriver for RecordingAmpDriver {
    fn enable_power(&self, on: bool) {
        self.record(AmpCall::EnablePower(on));
    }

    fn notify_mute_state(&self, muted: bool) {
        self.record(AmpCall::MuteState(muted));
    }
}

/// Chime player that records every cue
#[derive(Debug, Default)]
pub struct RecordingChimePlayer {
    played: Mutex<Vec<ChimeRequest>>,
}

impl RecordingChimePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<ChimeRequest> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl ChimePlayer for RecordingChimePlayer {
    fn play(&self, chime: &ChimeRequest) {
        if let Ok(mut played) = self.played.lock() {
            played.push(*chime);
        }
    }
}

/// Transport wrapper that fails the first `failures` sends
///
/// Every attempt, failed or not, is timestamped with tokio's clock so tests
/// running on a paused clock can check retry spacing.
#[derive(Debug)]
pub struct FlakyTransport<T> {
    inner: T,
    failures: usize,
    attempts: AtomicUsize,
    log: Mutex<Vec<(Instant, Request, bool)>>,
}

impl<T: Transport> FlakyTransport<T> {
    pub fn new(inner: T, failures: usize) -> Self {
        Self {
            inner,
            failures,
            attempts: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Number of sends attempted
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Time of each attempt
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.log
            .lock()
            .map(|log| log.iter().map(|(at, _, _)| *at).collect())
            .unwrap_or_default()
    }

    /// Requests that went through
    pub fn delivered(&self) -> Vec<Request> {
        self.log
            .lock()
            .map(|log| {
                log.iter()
                    .filter(|(_, _, ok)| *ok)
                    .map(|(_, request, _)| request.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<T: Transport> Transport for FlakyTransport<T> {
    fn send(&self, request: Request) -> Result<(), ChannelError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = if n < self.failures {
            debug!("Flaky transport failing send #{}", n + 1);
            Err(ChannelError::Busy)
        } else {
            self.inner.send(request.clone())
        };
        if let Ok(mut log) = self.log.lock() {
            log.push((Instant::now(), request, result.is_ok()));
        }
        result
    }
}

/// Transport that accepts everything and delivers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeTransport;

impl Transport for BlackholeTransport {
    fn send(&self, _request: Request) -> Result<(), ChannelError> {
        Ok(())
    }
}
