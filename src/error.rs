//! Transport and handshake errors.

use nusb::transfer::TransferError;
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by a fastboot transport.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("No fastboot device found. Is the device in bootloader mode?")]
    DeviceNotFound,

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Device disconnected")]
    Disconnected,

    #[error("USB error: {0}")]
    Usb(Arc<nusb::Error>),

    #[error("USB configuration error: {0}")]
    Configuration(String),

    #[error("USB transfer error: {0}")]
    Transfer(TransferError),

    #[error("Timeout during USB operation")]
    Timeout,

    #[error("Short write: expected {expected} bytes, device accepted {actual}")]
    ShortWrite { expected: usize, actual: usize },
}

impl From<nusb::Error> for TransportError {
    fn from(err: nusb::Error) -> Self {
        TransportError::Usb(Arc::new(err))
    }
}

impl From<TransferError> for TransportError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Disconnected => TransportError::Disconnected,
            other => TransportError::Transfer(other),
        }
    }
}

impl From<tokio::time::error::Elapsed> for TransportError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TransportError::Timeout
    }
}

/// The primary error type for an unlock attempt.
///
/// Every variant names the step that produced it so callers can inspect the
/// failure kind without matching on message text.
#[derive(Error, Debug, Clone)]
pub enum UnlockError {
    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("Device disconnected during the handshake")]
    Disconnected,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Identifier token size overflow: {actual} is more than {max} digits")]
    IdentifierOverflow { actual: usize, max: usize },

    #[error("Invalid signature encoding: {0}")]
    SignatureDecode(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transfer size overflow: {encoded} is more than {max_digits} digits")]
    TransferSizeOverflow { encoded: String, max_digits: usize },

    #[error("Unexpected response to download command: {0}")]
    UnexpectedDownloadResponse(String),

    #[error("Bootloader wants {offered} bytes, requested to send {requested} bytes")]
    SizeMismatch { requested: u64, offered: u64 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{0}")]
    ProtocolFail(String),

    #[error("Command '{0}' is too long")]
    CommandTooLong(String),

    #[error("Session already used, start a new one")]
    SessionReused,
}

impl From<TransportError> for UnlockError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Disconnected => UnlockError::Disconnected,
            other => UnlockError::Transport(other),
        }
    }
}
