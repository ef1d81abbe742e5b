//! Wire constants for the fastboot unlock handshake.

/// Length of the status prefix on every device response
pub const STATUS_LEN: usize = 4;

/// Status prefix: command completed
pub const STATUS_OKAY: &str = "OKAY";

/// Status prefix: device is ready to receive the given number of bytes
pub const STATUS_DATA: &str = "DATA";

/// Status prefix: command failed, remainder is the reason
pub const STATUS_FAIL: &str = "FAIL";

/// Status prefix: informational line, more packets follow
pub const STATUS_INFO: &str = "INFO";

/// Number of hex digits in a DATA size and in a download size header
pub const SIZE_HEADER_DIGITS: usize = 8;

/// Maximum size of a single command packet
pub const MAX_COMMAND_LEN: usize = 64;

/// Maximum size of a single response packet
pub const MAX_RESPONSE_LEN: usize = 64;

/// Line of the `oem get_identifier_token` reply that carries the token.
///
/// The device prints a header line and a blank/label line first; the token
/// sits on the third line. Nothing in the reply marks it otherwise.
pub const IDENTIFIER_TOKEN_LINE: usize = 2;

/// Identifier capacity in bytes
pub const IDENTIFIER_BYTES: usize = 64;

/// Identifier capacity in hex digits
pub const IDENTIFIER_HEX_DIGITS: usize = IDENTIFIER_BYTES * 2;

/// Command: read the device identifier token
pub const CMD_GET_IDENTIFIER_TOKEN: &str = "oem get_identifier_token";

/// Command prefix: negotiate a download, followed by a size header
pub const CMD_DOWNLOAD_PREFIX: &str = "download:";

/// Command: unlock the bootloader using the downloaded signature
pub const CMD_UNLOCK_BOOTLOADER: &str = "flashing unlock_bootloader";

/// Command: relock the bootloader
pub const CMD_LOCK_BOOTLOADER: &str = "flashing lock_bootloader";

/// USB interface class of a fastboot interface
pub const FASTBOOT_CLASS: u8 = 0xFF;

/// USB interface subclass of a fastboot interface
pub const FASTBOOT_SUBCLASS: u8 = 0x42;

/// USB interface protocol of a fastboot interface
pub const FASTBOOT_PROTOCOL: u8 = 0x03;
