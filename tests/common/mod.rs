//! Common test utilities and shared imports

// Not every test file uses every helper
#![allow(dead_code, unused_imports)]

pub use fastboot_unlock::error::{TransportError, UnlockError};
pub use fastboot_unlock::fastboot::{FastbootTransport, TransferProgress};
pub use fastboot_unlock::response::ProtocolResponse;
pub use fastboot_unlock::session::{SessionState, UnlockSession, lock_bootloader};
pub use fastboot_unlock::signer::{HexSigner, PayloadSigner};

use std::collections::VecDeque;

/// Replies of a device that accepts a 256-byte signature and unlocks.
pub const HAPPY_REPLIES: &[&str] = &[
    "INFOIdentifier token:",
    "INFO",
    "INFOABCDEF",
    "OKAY",
    "DATA00000100",
    "OKAY",
    "OKAY",
];

/// What the scripted transport does once its replies run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenExhausted {
    TimeOut,
    Disconnect,
    Hang,
}

/// In-memory transport replaying canned response packets.
pub struct ScriptedTransport {
    pub replies: VecDeque<String>,
    pub commands: Vec<String>,
    pub payloads: Vec<Vec<u8>>,
    pub chunk_size: usize,
    pub connected: bool,
    pub when_exhausted: WhenExhausted,
}

impl ScriptedTransport {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            commands: Vec::new(),
            payloads: Vec::new(),
            chunk_size: 100,
            connected: false,
            when_exhausted: WhenExhausted::TimeOut,
        }
    }

    pub fn exhausted(mut self, behaviour: WhenExhausted) -> Self {
        self.when_exhausted = behaviour;
        self
    }
}

impl FastbootTransport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        self.commands.push(command.to_string());
        Ok(())
    }

    async fn read_response(&mut self) -> Result<String, TransportError> {
        if let Some(reply) = self.replies.pop_front() {
            return Ok(reply);
        }
        match self.when_exhausted {
            WhenExhausted::TimeOut => Err(TransportError::Timeout),
            WhenExhausted::Disconnect => Err(TransportError::Disconnected),
            WhenExhausted::Hang => std::future::pending().await,
        }
    }

    async fn send_raw_payload(
        &mut self,
        data: &[u8],
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<(), TransportError> {
        let mut sent = 0;
        for chunk in data.chunks(self.chunk_size) {
            sent += chunk.len();
            progress(TransferProgress {
                sent,
                total: data.len(),
            });
        }
        self.payloads.push(data.to_vec());
        Ok(())
    }
}

/// Deterministic signer: the key is the signature length in bytes.
pub struct FillSigner;

impl HexSigner for FillSigner {
    type Key = usize;

    fn sign_hex(&self, len: &usize, message_hex: &str) -> Result<String, UnlockError> {
        assert_eq!(message_hex.len(), 128, "identifier must be presented as 128 hex digits");
        Ok("A5".repeat(*len))
    }
}

/// Signer returning a fixed string, for decode failures.
pub struct CannedSigner(pub &'static str);

impl HexSigner for CannedSigner {
    type Key = ();

    fn sign_hex(&self, _key: &(), _message_hex: &str) -> Result<String, UnlockError> {
        Ok(self.0.to_string())
    }
}

pub fn signer() -> PayloadSigner<FillSigner> {
    PayloadSigner::new(FillSigner)
}
