//! Bootloader unlock handshake.
//!
//! # Flow
//!
//! 1. `oem get_identifier_token`, token taken from the reply text
//! 2. Identifier signed with the caller's key
//! 3. `download:<size>` negotiated for the signature, device must answer
//!    `DATA` with the same size
//! 4. Signature sent as the raw download body, device must answer `OKAY`
//! 5. `flashing unlock_bootloader`, device answers `OKAY` or `FAIL<reason>`
//!
//! An [`UnlockSession`] covers exactly one attempt. It never retries; a failed
//! session ends in [`SessionState::Failed`] and a new one must be created to
//! try again.

use crate::constants::{CMD_DOWNLOAD_PREFIX, CMD_GET_IDENTIFIER_TOKEN, CMD_LOCK_BOOTLOADER, CMD_UNLOCK_BOOTLOADER};
use crate::error::UnlockError;
use crate::fastboot::{FastbootTransport, TransferProgress, read_reply, run_command};
use crate::identifier::{Identifier, normalize};
use crate::response::ProtocolResponse;
use crate::signer::{HexSigner, PayloadSigner};
use crate::transfer::encode_size;
use strum_macros::Display;
use tracing::{info, warn};

/// Progress of an unlock attempt. Only ever moves forward.
#[derive(Debug, Clone, Display)]
pub enum SessionState {
    #[strum(to_string = "idle")]
    Idle,
    #[strum(to_string = "token requested")]
    TokenRequested,
    #[strum(to_string = "token received")]
    TokenReceived,
    #[strum(to_string = "signed")]
    Signed,
    #[strum(to_string = "download negotiated")]
    DownloadNegotiated,
    #[strum(to_string = "payload sent")]
    PayloadSent,
    #[strum(to_string = "response confirmed")]
    ResponseConfirmed,
    #[strum(to_string = "unlock issued")]
    UnlockIssued,
    #[strum(to_string = "unlocked")]
    Unlocked,
    #[strum(to_string = "failed")]
    Failed(UnlockError),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Unlocked | SessionState::Failed(_))
    }

    /// The error that ended the session, if it failed.
    pub fn error(&self) -> Option<&UnlockError> {
        match self {
            SessionState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

type ProgressObserver<'a> = Box<dyn FnMut(TransferProgress) + 'a>;

/// One unlock attempt against a connected device.
///
/// The session borrows the transport mutably for its whole lifetime, so no
/// other command can be interleaved with the handshake.
pub struct UnlockSession<'a, T: FastbootTransport> {
    transport: &'a mut T,
    state: SessionState,
    identifier: Option<Identifier>,
    progress: Option<ProgressObserver<'a>>,
}

impl<'a, T: FastbootTransport> UnlockSession<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            state: SessionState::Idle,
            identifier: None,
            progress: None,
        }
    }

    /// Observe payload transfer progress.
    pub fn with_progress(mut self, observer: impl FnMut(TransferProgress) + 'a) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Identifier read from the device, once the token step has passed.
    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Run the handshake to completion.
    ///
    /// On failure the session is left in [`SessionState::Failed`] holding the
    /// same error that is returned.
    pub async fn unlock<S: HexSigner>(&mut self, signer: &PayloadSigner<S>, key: &S::Key) -> Result<(), UnlockError> {
        self.ensure_idle()?;
        let result = self.drive(signer, key).await;
        self.finish(result)
    }

    /// Like [`unlock`](Self::unlock), but gives up as soon as `abort`
    /// completes, e.g. on a disconnect notification or Ctrl+C.
    ///
    /// An aborted session ends in `Failed(Disconnected)`.
    pub async fn unlock_or_abort<S, F>(
        &mut self,
        signer: &PayloadSigner<S>,
        key: &S::Key,
        abort: F,
    ) -> Result<(), UnlockError>
    where
        S: HexSigner,
        F: Future<Output = ()>,
    {
        self.ensure_idle()?;
        let result = tokio::select! {
            result = self.drive(signer, key) => result,
            _ = abort => Err(UnlockError::Disconnected),
        };
        self.finish(result)
    }

    fn ensure_idle(&self) -> Result<(), UnlockError> {
        match self.state {
            SessionState::Idle => Ok(()),
            _ => Err(UnlockError::SessionReused),
        }
    }

    fn finish(&mut self, result: Result<(), UnlockError>) -> Result<(), UnlockError> {
        match result {
            Ok(()) => {
                self.state = SessionState::Unlocked;
                info!("Bootloader unlocked");
                Ok(())
            }
            Err(err) => {
                warn!(state = %self.state, error = %err, "Unlock failed");
                self.state = SessionState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "Unlock step");
        self.state = next;
    }

    async fn drive<S: HexSigner>(&mut self, signer: &PayloadSigner<S>, key: &S::Key) -> Result<(), UnlockError> {
        self.advance(SessionState::TokenRequested);
        let reply = run_command(&mut *self.transport, CMD_GET_IDENTIFIER_TOKEN).await?;
        let text = reply.into_okay().map_err(|err| match err {
            UnlockError::UnexpectedResponse(raw) => UnlockError::MalformedResponse(raw),
            other => other,
        })?;
        let identifier = normalize(text.split('\n'))?;
        info!(%identifier, "Identifier");
        self.identifier = Some(identifier.clone());
        self.advance(SessionState::TokenReceived);

        let signature = signer.sign(&identifier, key)?;
        self.advance(SessionState::Signed);

        let requested = signature.len() as u64;
        let size_header = encode_size(requested)?;
        let reply = run_command(&mut *self.transport, &format!("{CMD_DOWNLOAD_PREFIX}{size_header}")).await?;
        let offered = match reply.status.data_size() {
            Some(size) => size as u64,
            None => return Err(UnlockError::UnexpectedDownloadResponse(reply.status.to_raw())),
        };
        if offered != requested {
            return Err(UnlockError::SizeMismatch { requested, offered });
        }
        self.advance(SessionState::DownloadNegotiated);

        info!("Sending payload: {} bytes", signature.len());
        let mut noop = |_: TransferProgress| {};
        let observer: &mut dyn FnMut(TransferProgress) = match self.progress.as_mut() {
            Some(observer) => &mut **observer,
            None => &mut noop,
        };
        self.transport
            .send_raw_payload(signature.as_bytes(), observer)
            .await?;
        drop(signature);
        self.advance(SessionState::PayloadSent);

        info!("Payload sent, waiting for response...");
        read_reply(&mut *self.transport).await?.into_okay()?;
        self.advance(SessionState::ResponseConfirmed);

        let reply = run_command(&mut *self.transport, CMD_UNLOCK_BOOTLOADER).await?;
        self.advance(SessionState::UnlockIssued);
        reply.into_okay()?;
        Ok(())
    }
}

/// Relock the bootloader. Returns the device's reply text.
pub async fn lock_bootloader<T: FastbootTransport>(transport: &mut T) -> Result<String, UnlockError> {
    let reply = run_command(transport, CMD_LOCK_BOOTLOADER).await?;
    if let ProtocolResponse::Fail(message) = &reply.status {
        warn!(%message, "Lock rejected");
    }
    let text = reply.into_okay()?;
    info!("Bootloader locked");
    Ok(text)
}
