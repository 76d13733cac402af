use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Reads a NUL-terminated UTF-8 string.
pub fn get_cstring(buf: &mut impl Buf, what: &'static str) -> Result<String, ProtocolError> {
    let mut raw = Vec::new();
    loop {
        if !buf.has_remaining() {
            return Err(ProtocolError::malformed(what, "unterminated string"));
        }
        match buf.get_u8() {
            0 => break,
            byte => raw.push(byte),
        }
    }
    String::from_utf8(raw).map_err(|e| ProtocolError::malformed(what, e.to_string()))
}

pub fn put_cstring(buf: &mut impl BufMut, value: &str) {
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}

/// Fails with a `Malformed` error unless `buf` still holds `len` bytes.
pub fn require(buf: &impl Buf, len: usize, what: &'static str) -> Result<(), ProtocolError> {
    if buf.remaining() < len {
        return Err(ProtocolError::malformed(
            what,
            format!("need {len} bytes, have {}", buf.remaining()),
        ));
    }
    Ok(())
}
