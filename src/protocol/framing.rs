//! Line framing for the control channel.
//!
//! Every control message is a single UTF-8 line terminated by `\n`. Reads go
//! through an `AsyncBufRead` so the line boundary is exact: bytes after the
//! newline stay buffered for the next caller (header block or payload).

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Upper bound for a single control line, newline included.
pub const MAX_LINE_LENGTH: usize = 8192;

/// Writes `text` followed by a single `\n` and flushes.
pub async fn send_line<W>(conn: &mut W, text: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if text.contains('\n') {
        return Err(ProtocolError::EmbeddedNewline);
    }

    let mut buf = Vec::with_capacity(text.len() + 1);
    buf.extend_from_slice(text.as_bytes());
    buf.push(b'\n');

    conn.write_all(&buf).await?;
    conn.flush().await?;
    Ok(())
}

/// Reads one line, stripping the newline and trailing whitespace.
///
/// Returns `Ok(None)` when the peer closed the connection before sending any
/// byte of a new line. An empty line is `Ok(Some(""))`.
pub async fn receive_line<R>(conn: &mut R) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *conn)
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && n == MAX_LINE_LENGTH {
        discard_rest_of_line(conn).await?;
        return Err(ProtocolError::LineTooLong(MAX_LINE_LENGTH));
    }

    let line = String::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(Some(line.trim_end().to_string()))
}

/// Skips buffered input up to and including the next `\n`, or to EOF.
async fn discard_rest_of_line<R>(conn: &mut R) -> Result<(), ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buf = conn.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }

        let (consumed, done) = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (buf.len(), false),
        };
        conn.consume(consumed);
        if done {
            return Ok(());
        }
    }
}
