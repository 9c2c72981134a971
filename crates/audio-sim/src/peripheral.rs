//! Virtual audio peripheral
//!
//! Models the remote device at the message level: it answers get requests
//! with a notification, applies set requests and pushes the new state back,
//! and can be scripted to misbehave (lost replies, duplicate replies, refusing
//! to answer until it has "booted").

use audio_protocol::{AudioId, ChimeRequest, Notification, PaState, Request, RequestOp, Update};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Initial configuration of a virtual peripheral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualPeripheralConfig {
    /// PA state reported before any set request
    pub pa_state: PaState,
    /// Clip/overrun status reported
    pub clip_status: bool,
    /// Requests ignored before the peripheral starts answering
    #[serde(default)]
    pub boot_requests: u32,
}

impl Default for VirtualPeripheralConfig {
    fn default() -> Self {
        Self {
            pa_state: PaState::Mute,
            clip_status: false,
            boot_requests: 0,
        }
    }
}

/// Simulated peripheral
#[derive(Debug)]
pub struct VirtualPeripheral {
    pa_state: PaState,
    clip_status: bool,
    /// Requests still to be swallowed while "booting"
    booting: u32,
    /// Replies still to be lost
    drop_replies: u32,
    duplicate_replies: bool,
    /// Requests received (for test verification)
    received: Vec<Request>,
}

impl Default for VirtualPeripheral {
    fn default() -> Self {
        Self::new(VirtualPeripheralConfig::default())
    }
}

impl VirtualPeripheral {
    pub fn new(config: VirtualPeripheralConfig) -> Self {
        Self {
            pa_state: config.pa_state,
            clip_status: config.clip_status,
            booting: config.boot_requests,
            drop_replies: 0,
            duplicate_replies: false,
            received: Vec::new(),
        }
    }

    pub fn pa_state(&self) -> PaState {
        self.pa_state
    }

    pub fn clip_status(&self) -> bool {
        self.clip_status
    }

    /// Change the clip/overrun status the peripheral reports
    pub fn set_clip_status(&mut self, clipping: bool) {
        self.clip_status = clipping;
    }

    /// Lose the next `count` replies
    pub fn drop_next(&mut self, count: u32) {
        self.drop_replies = count;
    }

    /// Deliver every reply twice
    pub fn set_duplicate_replies(&mut self, enabled: bool) {
        self.duplicate_replies = enabled;
    }

    /// Requests received so far
    pub fn received(&self) -> &[Request] {
        &self.received
    }

    /// Notification pushing a chime cue, as the peripheral does unprompted
    pub fn chime(&self, chime: ChimeRequest) -> Notification {
        Notification::from_peripheral(Update::Chime(chime))
    }

    /// Handle a request and return the notifications it produces
    pub fn process(&mut self, request: Request) -> Vec<Notification> {
        self.received.push(request.clone());

        if self.booting > 0 {
            self.booting -= 1;
            debug!("Virtual peripheral still booting, ignoring {:?}", request);
            return Vec::new();
        }

        let update = match (request.op, request.id) {
            (RequestOp::Get, AudioId::PaState) => Some(Update::PaState(self.pa_state)),
            (RequestOp::Get, AudioId::ClipOverrun) => Some(Update::ClipOverrun(self.clip_status)),
            (RequestOp::Set, AudioId::PaState) => match request.payload.first() {
                Some(&raw) => {
                    self.pa_state = PaState::from_flag(raw as i32);
                    Some(Update::PaState(self.pa_state))
                }
                None => {
                    warn!("Virtual peripheral got PA set without payload");
                    None
                }
            },
            (RequestOp::Set, AudioId::ClipOverrun) => {
                self.clip_status = request.payload.first().is_some_and(|&raw| raw != 0);
                Some(Update::ClipOverrun(self.clip_status))
            }
            (op, id) => {
                warn!("Virtual peripheral ignoring {:?} for {}", op, id);
                None
            }
        };

        let Some(update) = update else {
            return Vec::new();
        };

        if self.drop_replies > 0 {
            self.drop_replies -= 1;
            debug!("Virtual peripheral losing reply {:?}", update);
            return Vec::new();
        }

        let notification = Notification::from_peripheral(update);
        if self.duplicate_replies {
            vec![notification.clone(), notification]
        } else {
            vec![notification]
        }
    }
}
