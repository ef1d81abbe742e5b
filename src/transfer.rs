//! Download size headers.

use crate::constants::SIZE_HEADER_DIGITS;
use crate::error::UnlockError;
use std::fmt;

/// An 8-digit lowercase hex byte count, as used by `download:` and `DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeHeader(String);

impl SizeHeader {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the header back into a byte count.
    pub fn value(&self) -> u32 {
        // Only constructed by encode_size, which guarantees 8 hex digits
        u32::from_str_radix(&self.0, 16).unwrap_or_default()
    }
}

impl fmt::Display for SizeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a byte count as a size header, refusing anything that does not fit
/// in 8 hex digits.
pub fn encode_size(byte_length: u64) -> Result<SizeHeader, UnlockError> {
    let encoded = format!("{:0width$x}", byte_length, width = SIZE_HEADER_DIGITS);
    if encoded.len() != SIZE_HEADER_DIGITS {
        return Err(UnlockError::TransferSizeOverflow {
            encoded,
            max_digits: SIZE_HEADER_DIGITS,
        });
    }
    Ok(SizeHeader(encoded))
}
