//! RethinkDB handshake constants

/// Magic number announcing the V1_0 handshake, sent little-endian
pub const VERSION_V1_0: u32 = 0x34c2_bdc3;

/// JSON protocol version spoken by this client
pub const PROTOCOL_VERSION: u32 = 0;

/// The only authentication method RethinkDB supports
pub const AUTH_METHOD_SCRAM_SHA_256: &str = "SCRAM-SHA-256";

/// Frame terminator for every handshake message
pub const NUL: u8 = 0;

/// Largest handshake frame accepted from the server (64 KiB).
///
/// Handshake responses are small JSON objects; anything bigger is rejected before it
/// can grow the read buffer without bound.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Server error codes in this range are authentication failures
pub const AUTH_ERROR_CODES: std::ops::RangeInclusive<i64> = 10..=20;
