//! Fastboot response decoding.
//!
//! Every packet the device sends back starts with a 4-character status code
//! followed by a free-form payload:
//!
//! | Prefix | Meaning                                   | Payload                  |
//! |--------|-------------------------------------------|--------------------------|
//! | `OKAY` | command completed                         | optional message         |
//! | `DATA` | ready to receive a download               | 8 hex digits, byte count |
//! | `FAIL` | command failed                            | reason                   |
//! | `INFO` | progress line, more packets will follow   | message                  |
//!
//! Anything else is kept verbatim as [`ProtocolResponse::Unknown`] so the caller
//! decides whether it is fatal.

use crate::constants::{SIZE_HEADER_DIGITS, STATUS_DATA, STATUS_FAIL, STATUS_INFO, STATUS_LEN, STATUS_OKAY};
use std::fmt;

/// One decoded device response packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolResponse {
    Okay(String),
    /// Pending download size, exactly as sent (8 hex digits).
    Data(String),
    Fail(String),
    Info(String),
    /// Unrecognized status, too-short packet, or a DATA packet with a bad size.
    Unknown(String),
}

impl ProtocolResponse {
    /// Decode a single raw response line. Never fails.
    pub fn parse(raw: &str) -> Self {
        let Some(status) = raw.get(..STATUS_LEN) else {
            return ProtocolResponse::Unknown(raw.to_string());
        };
        let payload = &raw[STATUS_LEN..];

        match status {
            STATUS_OKAY => ProtocolResponse::Okay(payload.to_string()),
            STATUS_FAIL => ProtocolResponse::Fail(payload.to_string()),
            STATUS_INFO => ProtocolResponse::Info(payload.to_string()),
            STATUS_DATA if is_size_hex(payload) => ProtocolResponse::Data(payload.to_string()),
            _ => ProtocolResponse::Unknown(raw.to_string()),
        }
    }

    /// Byte count announced by a `DATA` response.
    pub fn data_size(&self) -> Option<u32> {
        match self {
            ProtocolResponse::Data(size_hex) => u32::from_str_radix(size_hex, 16).ok(),
            _ => None,
        }
    }

    pub fn is_okay(&self) -> bool {
        matches!(self, ProtocolResponse::Okay(_))
    }

    /// Reconstruct the wire form of this response.
    pub fn to_raw(&self) -> String {
        match self {
            ProtocolResponse::Okay(m) => format!("{STATUS_OKAY}{m}"),
            ProtocolResponse::Data(m) => format!("{STATUS_DATA}{m}"),
            ProtocolResponse::Fail(m) => format!("{STATUS_FAIL}{m}"),
            ProtocolResponse::Info(m) => format!("{STATUS_INFO}{m}"),
            ProtocolResponse::Unknown(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for ProtocolResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

/// Convenience wrapper over [`ProtocolResponse::parse`].
pub fn parse(raw: &str) -> ProtocolResponse {
    ProtocolResponse::parse(raw)
}

fn is_size_hex(payload: &str) -> bool {
    payload.len() == SIZE_HEADER_DIGITS && payload.bytes().all(|b| b.is_ascii_hexdigit())
}
