//! Length-prefixed framing for messages crossing a serialization boundary.
//!
//! Wire format: `[u32 length (big-endian)][JSON payload]`

use std::io::{self, Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{RpcError, RpcResult};

/// Default upper bound on a single frame payload.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Write a length-prefixed JSON message to a stream.
pub fn write_message<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> RpcResult<()> {
    let payload = serde_json::to_vec(msg).map_err(|e| RpcError::Encode(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| RpcError::Encode(format!("payload too large: {} bytes", payload.len())))?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;

    Ok(())
}

/// Read a length-prefixed JSON message from a stream.
pub fn read_message<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    max_len: usize,
) -> RpcResult<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > max_len {
        return Err(RpcError::Decode(format!(
            "message too large: {} bytes (limit {})",
            len, max_len
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    serde_json::from_slice(&payload).map_err(|e| RpcError::Decode(e.to_string()))
}

/// Encode a message into a standalone frame.
pub fn encode<T: Serialize>(msg: &T) -> RpcResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_message(&mut buf, msg)?;
    Ok(buf)
}

/// Decode a standalone frame produced by [`encode`].
pub fn decode<T: DeserializeOwned>(frame: &[u8], max_len: usize) -> RpcResult<T> {
    let mut cursor = io::Cursor::new(frame);
    read_message(&mut cursor, max_len)
}
