//! Fastboot command layer.
//!
//! [`FastbootTransport`] is the raw packet interface a device connection must
//! provide. On top of it, [`run_command`] and [`read_reply`] implement the
//! fastboot reply convention: any number of `INFO` packets followed by exactly
//! one terminal `OKAY`, `DATA` or `FAIL` packet.

use crate::constants::MAX_COMMAND_LEN;
use crate::error::{TransportError, UnlockError};
use crate::response::ProtocolResponse;
use tracing::{debug, info};

/// Progress of a raw payload transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub sent: usize,
    pub total: usize,
}

/// Raw packet access to a fastboot device.
///
/// Implementations must serialize access themselves; callers hold `&mut` for
/// a whole command/response cycle.
#[allow(async_fn_in_trait)]
pub trait FastbootTransport {
    /// Open the device. Calling it on an open transport is a no-op.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Write one command packet.
    async fn send_command(&mut self, command: &str) -> Result<(), TransportError>;

    /// Read one raw response packet.
    async fn read_response(&mut self) -> Result<String, TransportError>;

    /// Write `data` as the body of a negotiated download.
    ///
    /// `progress` may be called any number of times, always before this
    /// returns.
    async fn send_raw_payload(
        &mut self,
        data: &[u8],
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<(), TransportError>;
}

/// Accumulated reply to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// `INFO` messages, each followed by `\n`, then any `OKAY` message.
    pub text: String,
    /// The terminal (non-`INFO`) response.
    pub status: ProtocolResponse,
}

impl CommandReply {
    /// DATA size hex, when the device accepted a download.
    pub fn data_size(&self) -> Option<&str> {
        match &self.status {
            ProtocolResponse::Data(size_hex) => Some(size_hex),
            _ => None,
        }
    }

    /// Require an `OKAY` terminal status.
    pub fn into_okay(self) -> Result<String, UnlockError> {
        match self.status {
            ProtocolResponse::Okay(_) => Ok(self.text),
            ProtocolResponse::Fail(message) => Err(UnlockError::ProtocolFail(message)),
            other => Err(UnlockError::UnexpectedResponse(other.to_raw())),
        }
    }
}

/// Send a command and collect its reply.
pub async fn run_command<T>(transport: &mut T, command: &str) -> Result<CommandReply, UnlockError>
where
    T: FastbootTransport,
{
    if command.len() > MAX_COMMAND_LEN {
        return Err(UnlockError::CommandTooLong(command.to_string()));
    }
    info!(command, "Sending command");
    transport.send_command(command).await?;
    read_reply(transport).await
}

/// Collect a reply without sending anything first.
pub async fn read_reply<T>(transport: &mut T) -> Result<CommandReply, UnlockError>
where
    T: FastbootTransport,
{
    let mut text = String::new();
    loop {
        let raw = transport.read_response().await?;
        debug!(response = %raw, "Response packet");
        match ProtocolResponse::parse(&raw) {
            ProtocolResponse::Info(message) => {
                info!("(bootloader) {}", message);
                text.push_str(&message);
                text.push('\n');
            }
            ProtocolResponse::Okay(message) => {
                text.push_str(&message);
                return Ok(CommandReply {
                    text,
                    status: ProtocolResponse::Okay(message),
                });
            }
            status => return Ok(CommandReply { text, status }),
        }
    }
}
