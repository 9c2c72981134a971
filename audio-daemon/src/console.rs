//! Line-oriented console
//!
//! Each stdin line is one command, shaped after how the attributes and the
//! control node are driven from a shell:
//!
//! ```text
//! cat pa_state
//! echo 1 > debug
//! ioctl 0x6101
//! ioctl 0x6102 1
//! chime 1 2 3 4
//! quit
//! ```

use std::str::FromStr;
use std::sync::Arc;

use audio_link::{AudioLink, LinkError, Property};
use audio_protocol::{parse_int, ChimeRequest, ControlCommand, ParseError, CONTROL_PAYLOAD_LEN};
use audio_sim::VirtualPeripheralCommand;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Console input errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Show(Property),
    Store { property: Property, value: String },
    Control { code: u32, value: Option<i32> },
    /// Have the virtual peripheral push a chime cue
    Chime(ChimeRequest),
    /// Last-known state, without querying the peripheral
    Status,
    Help,
    Quit,
}

/// Strip any leading path so `cat /sys/.../pa_state` works as well
fn property_name(text: &str) -> Result<Property, ConsoleError> {
    let name = text.rsplit('/').next().unwrap_or(text);
    Ok(name.parse::<Property>()?)
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ConsoleError::Empty);
        };

        match verb {
            "cat" => match (words.next(), words.next()) {
                (Some(name), None) => Ok(Self::Show(property_name(name)?)),
                _ => Err(ConsoleError::Usage("cat <property>")),
            },
            "echo" => {
                let rest = line.trim_start().strip_prefix("echo").unwrap_or_default();
                let Some((value, target)) = rest.rsplit_once('>') else {
                    return Err(ConsoleError::Usage("echo <value> > <property>"));
                };
                let value = value.trim();
                if value.is_empty() {
                    return Err(ConsoleError::Usage("echo <value> > <property>"));
                }
                Ok(Self::Store {
                    property: property_name(target.trim())?,
                    value: format!("{}\n", value),
                })
            }
            "ioctl" => {
                let code = words
                    .next()
                    .ok_or(ConsoleError::Usage("ioctl <code> [value]"))?;
                let value = words.next().map(parse_int).transpose()?;
                Ok(Self::Control {
                    code: parse_int(code)? as u32,
                    value,
                })
            }
            "chime" => {
                const USAGE: &str = "chime <tone> <period> <cycle> <location> (each 0-255)";
                let fields = words
                    .map(|w| -> Result<u8, ConsoleError> {
                        u8::try_from(parse_int(w)?).map_err(|_| ConsoleError::Usage(USAGE))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                match fields[..] {
                    [tone, period, cycle, location] => {
                        Ok(Self::Chime(ChimeRequest::new(tone, period, cycle, location)))
                    }
                    _ => Err(ConsoleError::Usage(USAGE)),
                }
            }
            "status" => Ok(Self::Status),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }
}

pub const HELP: &str = "\
commands:
  cat <debug|pa_state|chime>
  echo <value> > <debug|pa_state>
  ioctl <code> [value]      (0x6101 get PA, 0x6102 set PA, 0x6103 get clip, 0x6104 set clip)
  chime <tone> <period> <cycle> <location>
  status
  quit
";

/// What the console should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

/// Executes console commands against a link
pub struct Console {
    link: Arc<AudioLink>,
    peripheral_tx: mpsc::Sender<VirtualPeripheralCommand>,
}

impl Console {
    pub fn new(link: Arc<AudioLink>, peripheral_tx: mpsc::Sender<VirtualPeripheralCommand>) -> Self {
        Self {
            link,
            peripheral_tx,
        }
    }

    /// Run one command; `interrupt` aborts a blocked query
    pub async fn execute(
        &self,
        command: ConsoleCommand,
        interrupt: &CancellationToken,
    ) -> Result<Reply, LinkError> {
        debug!(?command, "console");
        let output = match command {
            ConsoleCommand::Show(property) => self.link.show(property, interrupt).await,
            ConsoleCommand::Store { property, value } => {
                let written = self.link.store(property, &value)?;
                format!("{} bytes written\n", written)
            }
            ConsoleCommand::Control { code, value } => {
                let mut arg = [0u8; CONTROL_PAYLOAD_LEN];
                if let Some(value) = value {
                    arg = value.to_le_bytes();
                }
                self.link.handle_control(code, &mut arg, interrupt).await?;
                match ControlCommand::from_code(code) {
                    Ok(command) if command.is_get() => {
                        format!("{}\n", i32::from_le_bytes(arg))
                    }
                    _ => "ok\n".to_string(),
                }
            }
            ConsoleCommand::Chime(chime) => {
                self.peripheral_tx
                    .send(VirtualPeripheralCommand::Chime(chime))
                    .await
                    .map_err(|_| LinkError::Dispatch(audio_protocol::ChannelError::Closed))?;
                "ok\n".to_string()
            }
            ConsoleCommand::Status => {
                let state = self.link.snapshot();
                format!(
                    "mode: {} ({})\nPA: {}\nclip: {}\n",
                    state.mode,
                    state.mode.name(),
                    state.pa_state_display(),
                    state.clip_display()
                )
            }
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Output(output))
    }
}
