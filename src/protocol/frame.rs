/*!
 * Frame Codec
 * 4-byte big-endian length prefix, then the payload
 *
 * Reads accumulate until the whole frame has arrived; one transport read is
 * never assumed to be one message.
 */

use super::{ProtocolError, ProtocolResult};
use std::io::{Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const HEADER_LEN: usize = 4;

fn encode(payload: &[u8], max_len: usize) -> ProtocolResult<Vec<u8>> {
    if payload.len() > max_len || payload.len() > u32::MAX as usize {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: max_len,
        });
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

fn payload_len(header: [u8; HEADER_LEN], max_len: usize) -> ProtocolResult<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(ProtocolError::FrameTooLarge { len, max: max_len });
    }
    Ok(len)
}

/// Read one frame; `Ok(None)` on a clean close between frames
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> ProtocolResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let n = reader.read(&mut header).await?;
    if n == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut header[n..]).await?;

    let len = payload_len(header, max_len)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_len: usize) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(payload, max_len)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Blocking counterpart of [`read_frame`], used by the client
pub fn read_frame_blocking<R: Read>(reader: &mut R, max_len: usize) -> ProtocolResult<Option<Vec<u8>>> {
    let mut header = [0u8; HEADER_LEN];
    let n = loop {
        match reader.read(&mut header) {
            Ok(n) => break n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };
    if n == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut header[n..])?;

    let len = payload_len(header, max_len)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

pub fn write_frame_blocking<W: Write>(writer: &mut W, payload: &[u8], max_len: usize) -> ProtocolResult<()> {
    let frame = encode(payload, max_len)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}
