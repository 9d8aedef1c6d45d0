//! Frame codec for the tool-call wire protocol.
//!
//! Frame format:
//! ```text
//! ┌──────────┬──────────┬────────────────────────┐
//! │ len (4B) │ type(1B) │   msgpack payload      │
//! │ u32 BE   │ u8       │                        │
//! └──────────┴──────────┴────────────────────────┘
//! ```
//! Length = sizeof(type byte) + sizeof(payload), NOT including the 4-byte prefix.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Message type: request from client.
pub const MSG_REQUEST: u8 = 0x01;
/// Message type: response envelope (success or structured call failure).
pub const MSG_RESPONSE: u8 = 0x02;
/// Message type: protocol-level failure (bad frame type, undecodable request).
pub const MSG_ERROR: u8 = 0xFF;

/// One frame pulled off the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Well-formed frame: `(msg_type, payload)`.
    Message(u8, Vec<u8>),
    /// Framing violation the stream has already skipped past. The connection
    /// stays in sync and may keep reading.
    Rejected(String),
}

/// Read one frame from the stream.
///
/// Returns `None` on clean EOF. Empty frames and frames over
/// `max_frame_bytes` come back as [`Frame::Rejected`]; an oversized body is
/// drained first so the next read starts on a frame boundary. Only transport
/// failures are `Err`.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame_bytes: u32,
) -> std::io::Result<Option<Frame>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let frame_len = u32::from_be_bytes(len_buf);
    if frame_len > max_frame_bytes {
        let mut body = (&mut *reader).take(u64::from(frame_len));
        let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
        if skipped < u64::from(frame_len) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended inside an oversized frame",
            ));
        }
        return Ok(Some(Frame::Rejected(format!(
            "frame too large: {} bytes (max {})",
            frame_len, max_frame_bytes
        ))));
    }
    if frame_len < 1 {
        return Ok(Some(Frame::Rejected("frame too short: missing type byte".to_string())));
    }

    let mut frame_data = vec![0u8; frame_len as usize];
    reader.read_exact(&mut frame_data).await?;
    let payload = frame_data.split_off(1);

    Ok(Some(Frame::Message(frame_data[0], payload)))
}

/// Write one frame to the stream.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u8,
    payload: &[u8],
) -> std::io::Result<()> {
    let frame_len = u32::try_from(payload.len() + 1).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "payload exceeds u32 frame length")
    })?;
    writer.write_all(&frame_len.to_be_bytes()).await?;
    writer.write_all(&[msg_type]).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Encode a value to msgpack with named fields.
pub fn encode_msgpack<T: Serialize + ?Sized>(value: &T) -> std::io::Result<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| {
        tracing::error!(error = %e, "msgpack encoding failed");
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })
}
