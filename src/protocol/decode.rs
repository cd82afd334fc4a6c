//! Handshake message decoding

use super::constants::{MAX_FRAME_LENGTH, NUL};
use super::message::{BackendMessage, ServerReply};
use bytes::BytesMut;
use std::io;

/// Decode one null-terminated server reply from the front of `data`.
///
/// Does not modify the buffer; the caller advances it by the returned count.
///
/// # Returns
/// `Ok((msg, consumed))` - Message and number of bytes consumed, terminator included
/// `Err(e)` - `UnexpectedEof` if no complete frame is buffered yet,
/// `InvalidData` if the frame is oversized or not valid JSON
pub fn decode_message(data: &BytesMut) -> io::Result<(BackendMessage, usize)> {
    let Some(end) = data.iter().position(|b| *b == NUL) else {
        if data.len() > MAX_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "handshake frame exceeds maximum length {}",
                    MAX_FRAME_LENGTH
                ),
            ));
        }
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "incomplete handshake frame",
        ));
    };

    if end > MAX_FRAME_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "handshake frame of {} bytes exceeds maximum length {}",
                end, MAX_FRAME_LENGTH
            ),
        ));
    }

    let frame = &data[..end];
    let reply: ServerReply = serde_json::from_slice(frame).map_err(|e| {
        // Pre-V1_0 servers answer with a plain-text error instead of JSON
        let text = String::from_utf8_lossy(frame);
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid handshake reply '{}': {}", text, e),
        )
    })?;

    let msg = BackendMessage::try_from(reply)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok((msg, end + 1))
}
