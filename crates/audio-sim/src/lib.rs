//! Audio Peripheral Simulation Library
//!
//! This crate provides a simulation layer for exercising the audio link
//! without peripheral hardware. It includes:
//!
//! - **VirtualPeripheral**: answers requests the way the remote device does,
//!   with scriptable lost, duplicate and delayed replies
//! - **run_virtual_peripheral_task**: actor that serves a link's channels
//! - **Recording hooks**: amplifier driver and chime player fakes, plus a
//!   transport that fails on demand
//!
//! # Example
//!
//! ```rust
//! use audio_protocol::{AudioId, PaState, Request, Update};
//! use audio_sim::VirtualPeripheral;
//!
//! let mut peripheral = VirtualPeripheral::default();
//! let replies = peripheral.process(Request::set(AudioId::PaState, [1u8]));
//! assert_eq!(replies[0].update, Update::PaState(PaState::Unmute));
//! ```

pub mod hooks;
pub mod peripheral;
pub mod peripheral_task;

pub use hooks::{AmpCall, BlackholeTransport, FlakyTransport, RecordingAmpDriver, RecordingChimePlayer};
pub use peripheral::{VirtualPeripheral, VirtualPeripheralConfig};
pub use peripheral_task::{run_virtual_peripheral_task, VirtualPeripheralCommand};
