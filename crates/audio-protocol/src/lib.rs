//! Audio Peripheral Protocol Library
//!
//! This crate defines the vocabulary used to talk to a remote audio-control
//! peripheral over an asynchronous, fire-and-forget channel:
//!
//! - **Identifiers**: the small closed set of quantities the peripheral holds
//! - **Values**: PA mute state, clip/overrun status, chime cues, debug modes
//! - **Messages**: requests sent out and notifications delivered back
//! - **Control codes**: the binary command set exposed to local clients
//!
//! The transport that carries these messages is not part of this crate.
//!
//! # Example
//!
//! ```rust
//! use audio_protocol::{AudioId, Notification, PaState, Request, Update};
//!
//! let request = Request::get(AudioId::PaState);
//! assert!(request.is_get());
//!
//! let reply = Notification::from_peripheral(Update::PaState(PaState::Unmute));
//! assert_eq!(reply.update.id(), Some(AudioId::PaState));
//! ```

pub mod command;
pub mod control;
pub mod error;
pub mod message;

pub use command::{parse_int, AudioId, ChimeRequest, DebugMode, PaState, PA_STATE_INVALID};
pub use control::{ControlCommand, CONTROL_PAYLOAD_LEN};
pub use error::{ChannelError, ParseError};
pub use message::{Notification, Origin, Request, RequestOp, Update};
