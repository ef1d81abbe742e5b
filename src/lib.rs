//! Signed-token bootloader unlock over fastboot.
//!
//! The handshake lives in [`session`]; [`device`] provides the USB transport
//! and [`signer`] the RSA primitive. Everything below the session is pure and
//! can be used on its own.

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod fastboot;
pub mod identifier;
pub mod response;
pub mod session;
pub mod signer;
pub mod transfer;

pub use config::DeviceConfig;
pub use device::{FastbootDeviceInfo, UsbFastboot, list_fastboot_devices};
pub use error::{TransportError, UnlockError};
pub use fastboot::{CommandReply, FastbootTransport, TransferProgress};
pub use identifier::Identifier;
pub use response::ProtocolResponse;
pub use session::{SessionState, UnlockSession, lock_bootloader};
pub use signer::{HexSigner, PayloadSigner, RsaSha256Signer, Signature};
pub use transfer::{SizeHeader, encode_size};
