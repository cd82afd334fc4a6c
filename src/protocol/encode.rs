//! Handshake message encoding

use super::constants::{NUL, VERSION_V1_0};
use super::message::FrontendMessage;
use bytes::{BufMut, BytesMut};
use std::io;

/// Encode a frontend message into bytes
pub fn encode_message(msg: &FrontendMessage) -> io::Result<BytesMut> {
    let mut buf = BytesMut::new();

    match msg {
        FrontendMessage::Hello(hello) => {
            // Magic number has no terminator; the JSON that follows does
            buf.put_u32_le(VERSION_V1_0);
            encode_json(&mut buf, hello)?;
        }
        FrontendMessage::Auth(auth) => {
            encode_json(&mut buf, auth)?;
        }
    }

    Ok(buf)
}

fn encode_json<T: serde::Serialize>(buf: &mut BytesMut, value: &T) -> io::Result<()> {
    let json = serde_json::to_vec(value)?;
    buf.put(json.as_slice());
    buf.put_u8(NUL);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{ClientAuth, ClientHello};

    #[test]
    fn test_encode_hello() {
        let msg = FrontendMessage::Hello(ClientHello {
            protocol_version: 0,
            authentication_method: "SCRAM-SHA-256".to_string(),
            authentication: "n,,n=admin,r=abc".to_string(),
        });
        let buf = encode_message(&msg).unwrap();

        assert_eq!(&buf[..4], &[0xc3, 0xbd, 0xc2, 0x34]);
        assert_eq!(*buf.last().unwrap(), 0);

        let json: serde_json::Value = serde_json::from_slice(&buf[4..buf.len() - 1]).unwrap();
        assert_eq!(json["protocol_version"], 0);
        assert_eq!(json["authentication_method"], "SCRAM-SHA-256");
        assert_eq!(json["authentication"], "n,,n=admin,r=abc");
    }

    #[test]
    fn test_encode_auth() {
        let msg = FrontendMessage::Auth(ClientAuth {
            authentication: "c=biws,r=abc,p=xyz".to_string(),
        });
        let buf = encode_message(&msg).unwrap();

        assert_eq!(
            &buf[..],
            b"{\"authentication\":\"c=biws,r=abc,p=xyz\"}\0".as_slice()
        );
    }
}
