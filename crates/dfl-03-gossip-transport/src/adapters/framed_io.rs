//! Single-frame read/write over an async byte stream.

use crate::domain::errors::TransportError;
use dfl_01_wire_codec::{encode_frame, CommandType, Frame, FrameDecoder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 8 * 1024;

/// Read exactly one frame.
///
/// Returns `Ok(None)` if the peer closes before sending anything. Bytes
/// beyond the single expected frame, or a close in the middle of a frame,
/// are protocol violations.
pub async fn read_one_frame<R>(
    reader: &mut R,
    max_payload_len: usize,
) -> Result<Option<Frame>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::with_max_payload(max_payload_len);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            if decoder.is_idle() {
                return Ok(None);
            }
            return Err(TransportError::ProtocolViolation(
                "connection closed mid-frame".into(),
            ));
        }

        let mut frames = decoder.feed_collect(&buf[..n])?;
        match frames.len() {
            0 => continue,
            1 if decoder.is_idle() => return Ok(frames.pop()),
            _ => {
                return Err(TransportError::ProtocolViolation(
                    "bytes received beyond the single expected frame".into(),
                ))
            }
        }
    }
}

/// Encode and write one frame.
pub async fn write_frame<W>(
    writer: &mut W,
    command: CommandType,
    payload: &[u8],
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(command, payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
