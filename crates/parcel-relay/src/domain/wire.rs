//! Parcel wire protocol.
//!
//! One request/response exchange per TCP connection:
//!
//! ```text
//! client → server   [16]      parcel id (big-endian UUID bytes)
//! server → client   [1]       response code
//! server → client   [4]       payload length, big-endian u32   (Ok only)
//! server → client   [length]  codec bytes                      (Ok only)
//! ```
//!
//! The server closes the connection after the response.

/// Size of the parcel id sent by the client.
pub const PARCEL_ID_LEN: usize = 16;

/// Size of the response code.
pub const STATUS_LEN: usize = 1;

/// Size of the payload length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest payload the length prefix can describe.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Response code sent by the parcel server.
///
/// The server only ever sends these three values; anything else seen by a
/// client is treated as an unknown status.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    /// Parcel found; length and payload follow
    Ok = 0,
    /// The id could not be read
    BadRequest = 1,
    /// Parcel absent, already taken, or expired
    NotFound = 2,
}

impl ResponseCode {
    /// Byte value on the wire.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Decode a status byte; `None` for values the protocol does not define.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Ok),
            1 => Some(Self::BadRequest),
            2 => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// Encode a payload length, or `None` if it does not fit the prefix.
pub fn encode_length(len: usize) -> Option<[u8; LENGTH_PREFIX_LEN]> {
    u32::try_from(len).ok().map(u32::to_be_bytes)
}

/// Decode a payload length prefix.
pub fn decode_length(bytes: [u8; LENGTH_PREFIX_LEN]) -> u32 {
    u32::from_be_bytes(bytes)
}
