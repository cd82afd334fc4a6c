#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use reql_wire::protocol::decode_message;

fuzz_target!(|data: &[u8]| {
    let mut buf = BytesMut::from(data);

    // Several handshake replies may arrive in one TCP segment
    while !buf.is_empty() {
        match decode_message(&buf) {
            Ok((_, consumed)) => {
                assert!(consumed > 0 && consumed <= buf.len());
                let _ = buf.split_to(consumed);
            }
            Err(_) => break,
        }
    }
});
