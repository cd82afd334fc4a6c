//! RethinkDB V1_0 handshake protocol
//!
//! Every frame after the 4-byte magic number is a JSON object terminated by a NUL
//! byte.

pub mod constants;
mod decode;
mod encode;
mod message;

pub use decode::decode_message;
pub use encode::encode_message;
pub use message::{BackendMessage, ClientAuth, ClientHello, FrontendMessage, ServerReply};
