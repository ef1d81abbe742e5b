//! Device identifier token extraction.
//!
//! `oem get_identifier_token` answers with a few `INFO` lines; the token itself
//! is printed as hex on line [`IDENTIFIER_TOKEN_LINE`]. The token is
//! zero-extended to a fixed 64-byte identifier before signing.

use crate::constants::{IDENTIFIER_BYTES, IDENTIFIER_HEX_DIGITS, IDENTIFIER_TOKEN_LINE};
use crate::error::UnlockError;
use std::fmt;

/// 64-byte device identifier, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    bytes: [u8; IDENTIFIER_BYTES],
}

impl Identifier {
    /// Create an Identifier from raw bytes
    pub fn from_bytes(bytes: [u8; IDENTIFIER_BYTES]) -> Self {
        Self { bytes }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_BYTES] {
        &self.bytes
    }

    /// Lowercase 128-digit hex form, as handed to the signer.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Extract the identifier from the full text of a token reply.
    pub fn from_response(text: &str) -> Result<Self, UnlockError> {
        normalize(text.split('\n'))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Pick the token line out of a token reply and pad it to a full identifier.
///
/// Shorter tokens are right-padded with `'0'` digits; longer ones are rejected
/// rather than truncated.
pub fn normalize<'a, I>(lines: I) -> Result<Identifier, UnlockError>
where
    I: IntoIterator<Item = &'a str>,
{
    let line = lines.into_iter().nth(IDENTIFIER_TOKEN_LINE).ok_or_else(|| {
        UnlockError::MalformedResponse(format!(
            "identifier token reply has no line {}",
            IDENTIFIER_TOKEN_LINE + 1
        ))
    })?;
    let token = line.trim();

    if token.len() > IDENTIFIER_HEX_DIGITS {
        return Err(UnlockError::IdentifierOverflow {
            actual: token.len(),
            max: IDENTIFIER_HEX_DIGITS,
        });
    }
    if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(UnlockError::MalformedResponse(format!(
            "identifier token is not hex: {token:?}"
        )));
    }

    let padded = format!("{:0<width$}", token.to_ascii_lowercase(), width = IDENTIFIER_HEX_DIGITS);
    let mut bytes = [0u8; IDENTIFIER_BYTES];
    hex::decode_to_slice(&padded, &mut bytes)
        .map_err(|e| UnlockError::MalformedResponse(format!("identifier token: {e}")))?;

    Ok(Identifier { bytes })
}
