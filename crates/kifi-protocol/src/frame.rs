//! Native-messaging framing: a little-endian `u32` byte length followed by
//! that many bytes of UTF-8 JSON.

use std::io::{ErrorKind, Read, Write};

use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Frame a JSON value.
pub fn encode(value: &Value) -> ProtocolResult<Vec<u8>> {
    let payload =
        serde_json::to_vec(value).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Read one frame. Returns `Ok(None)` on a clean end of stream before the
/// length prefix.
pub fn read_frame(reader: &mut impl Read) -> ProtocolResult<Option<Value>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(|e| {
        ProtocolError::FramingError(format!("truncated frame of {len} bytes: {e}"))
    })?;
    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(|e| ProtocolError::Deserialization(e.to_string()))
}

/// Write one frame and flush.
pub fn write_frame(writer: &mut impl Write, value: &Value) -> ProtocolResult<()> {
    writer.write_all(&encode(value)?)?;
    writer.flush()?;
    Ok(())
}
