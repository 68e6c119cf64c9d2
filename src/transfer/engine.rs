//! Module `engine`
//!
//! Streams payload bytes across an established data channel with an exact
//! byte-count contract. Files and in-memory listings go through the same
//! two functions.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransferError;

/// Largest chunk moved by a single read or write.
pub const CHUNK_SIZE: usize = 4096;

/// Copies exactly `total_length` bytes from `source` to `conn`.
///
/// Fails with `SourceExhausted` if `source` ends before `total_length` bytes
/// were produced.
pub async fn send_stream<W, R>(
    conn: &mut W,
    source: &mut R,
    total_length: u64,
) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    if total_length == 0 {
        return Err(TransferError::InvalidLength);
    }

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    while sent < total_length {
        let want = chunk_len(total_length - sent);
        let n = source.read(&mut buffer[..want]).await?;
        if n == 0 {
            return Err(TransferError::SourceExhausted {
                expected: total_length,
                sent,
            });
        }

        conn.write_all(&buffer[..n]).await?;
        sent += n as u64;
        debug!("Sent {}/{} bytes", sent, total_length);
    }

    conn.flush().await?;
    info!("Transfer sent {} bytes", sent);
    Ok(sent)
}

/// Reads exactly `total_length` bytes from `conn` into `sink`.
///
/// Fails with `Truncated` when `conn` reaches EOF first. Bytes already
/// written to `sink` are left in place.
pub async fn receive_stream<R, W>(
    conn: &mut R,
    sink: &mut W,
    total_length: u64,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if total_length == 0 {
        return Err(TransferError::InvalidLength);
    }

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut received = 0u64;

    while received < total_length {
        let want = chunk_len(total_length - received);
        let n = conn.read(&mut buffer[..want]).await?;
        if n == 0 {
            sink.flush().await?;
            return Err(TransferError::Truncated {
                expected: total_length,
                received,
            });
        }

        sink.write_all(&buffer[..n]).await?;
        received += n as u64;
        debug!("Received {}/{} bytes", received, total_length);
    }

    sink.flush().await?;
    info!("Transfer received {} bytes", received);
    Ok(received)
}

fn chunk_len(remaining: u64) -> usize {
    usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE))
}
