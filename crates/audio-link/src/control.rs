//! Binary control surface
//!
//! Same operations as the property surface, addressed by numeric command
//! code with a fixed 4-byte payload. Get commands write their result into
//! the caller's buffer; set commands read from it.

use audio_protocol::control::{decode_value, encode_value};
use audio_protocol::{
    AudioId, ControlCommand, DebugMode, Notification, PaState, Update, CONTROL_PAYLOAD_LEN,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::engine::AudioLink;
use crate::error::{LinkError, Result};

impl AudioLink {
    /// Handle a control command
    ///
    /// In [`DebugMode::SimulateRemoteTest`] set commands are applied locally
    /// instead of being sent to the peripheral.
    pub async fn handle_control(
        &self,
        code: u32,
        arg: &mut [u8],
        interrupt: &CancellationToken,
    ) -> Result<()> {
        let command = ControlCommand::from_code(code).map_err(|_| {
            error!("control command 0x{:04X} is not supported", code);
            LinkError::UnsupportedCommand(code)
        })?;
        debug!(?command, "control");

        if arg.len() < CONTROL_PAYLOAD_LEN {
            error!(?command, "payload buffer too small ({} bytes)", arg.len());
            return Err(LinkError::BadBuffer {
                needed: CONTROL_PAYLOAD_LEN,
                got: arg.len(),
            });
        }

        match command {
            ControlCommand::GetPaState => {
                self.query(AudioId::PaState, interrupt).await?;
                let raw = PaState::raw_or_invalid(self.pa_state());
                debug!("PA State: 0x{:x}", raw);
                write_value(arg, raw as i32);
            }
            ControlCommand::GetClipOverrun => {
                self.query(AudioId::ClipOverrun, interrupt).await?;
                let raw = match self.clip_status() {
                    Some(clipping) => clipping as i32,
                    None => -1,
                };
                debug!("PA clip overrun: 0x{:x}", raw);
                write_value(arg, raw);
            }
            ControlCommand::SetPaState => {
                let value = read_value(arg)?;
                debug!("PA State: 0x{:x}", value);
                if self.mode() == DebugMode::SimulateRemoteTest {
                    let state = PaState::try_from(value)?;
                    self.on_reply(Notification::simulated(Update::PaState(state)));
                } else {
                    self.send_set(AudioId::PaState, [value as u8])?;
                }
            }
            ControlCommand::SetClipOverrun => {
                let value = read_value(arg)?;
                debug!("PA clip overrun: 0x{:x}", value);
                if self.mode() == DebugMode::SimulateRemoteTest {
                    self.on_reply(Notification::simulated(Update::ClipOverrun(value != 0)));
                } else {
                    self.send_set(AudioId::ClipOverrun, [value as u8])?;
                }
            }
        }

        Ok(())
    }
}

fn write_value(arg: &mut [u8], value: i32) {
    arg[..CONTROL_PAYLOAD_LEN].copy_from_slice(&encode_value(value));
}

fn read_value(arg: &[u8]) -> Result<i32> {
    decode_value(arg).ok_or(LinkError::BadBuffer {
        needed: CONTROL_PAYLOAD_LEN,
        got: arg.len(),
    })
}
