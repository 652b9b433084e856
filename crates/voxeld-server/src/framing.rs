// crates/voxeld-server/src/framing.rs
// ============================================================================
// Module: Framing
// Description: Newline-delimited JSON message framing over an async stream.
// Purpose: Keep the "one line = one message, size-capped" contract in one
//          place; adapted from the teacher's Content-Length stdio framing
//          to this daemon's newline-delimited wire protocol (§4.1, §9).
// Dependencies: tokio (io)
// ============================================================================

use std::io::ErrorKind;

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;

use crate::error::DaemonError;

/// Why [`read_message`] did not return a line.
///
/// Distinguished so the caller can tell an oversized frame (reply with a
/// parse error, then close per §4.1) apart from invalid UTF-8 (reply with a
/// parse error, but keep the connection open) apart from a genuine
/// transport failure (close without a reply).
#[derive(Debug)]
pub enum FramingError {
    /// The line (or its accumulated partial chunks) exceeded
    /// `max_message_bytes`. Terminal for the connection.
    Oversized,
    /// `read_line` hit bytes that are not valid UTF-8. Not terminal.
    InvalidUtf8,
    /// A socket error, or EOF in the middle of a message. Terminal.
    Io(String),
}

/// Reads one complete line (a message) from `reader`, enforcing
/// `max_message_bytes`. Returns `Ok(None)` on clean EOF with no partial
/// data. The reader is left positioned past the failing line so it does
/// not get replayed on the next call.
///
/// Trims a single trailing `\r` (for clients that frame with `\r\n`).
/// Whitespace-only lines are returned as `Some(String::new())`, leaving the
/// "ignore empty lines" policy to the caller.
pub async fn read_message(
    reader: &mut BufReader<impl tokio::io::AsyncRead + Unpin>,
    max_message_bytes: usize,
) -> Result<Option<String>, FramingError> {
    let mut line = String::new();
    let mut total_read = 0usize;
    loop {
        let mut chunk = String::new();
        let bytes_read = match reader.read_line(&mut chunk).await {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::InvalidData => return Err(FramingError::InvalidUtf8),
            Err(err) => return Err(FramingError::Io(err.to_string())),
        };
        if bytes_read == 0 {
            return if line.is_empty() {
                Ok(None)
            } else {
                Err(FramingError::Io("connection closed mid-message".to_string()))
            };
        }
        total_read = total_read.saturating_add(bytes_read);
        if total_read > max_message_bytes {
            return Err(FramingError::Oversized);
        }
        let ends_in_newline = chunk.ends_with('\n');
        line.push_str(&chunk);
        if ends_in_newline {
            break;
        }
    }
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Writes one message as a single contiguous buffer: the serialized JSON
/// payload followed by `\n`. Never splits a logical message across two
/// writer calls at the application layer (§4.1).
pub async fn write_message(
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    payload: &str,
) -> Result<(), DaemonError> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.extend_from_slice(payload.as_bytes());
    buf.push(b'\n');
    writer
        .write_all(&buf)
        .await
        .map_err(|err| DaemonError::Transport(err.to_string()))?;
    writer.flush().await.map_err(|err| DaemonError::Transport(err.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use tokio::io::BufReader;

    use super::read_message;
    use super::write_message;
    use super::FramingError;

    #[tokio::test]
    async fn reads_one_line_at_a_time() {
        let input = b"first\nsecond\n".to_vec();
        let mut reader = BufReader::new(&input[..]);
        assert_eq!(read_message(&mut reader, 1024).await.unwrap(), Some("first".to_string()));
        assert_eq!(read_message(&mut reader, 1024).await.unwrap(), Some("second".to_string()));
        assert_eq!(read_message(&mut reader, 1024).await.unwrap(), None);
    }

    #[tokio::test]
    async fn trims_trailing_carriage_return() {
        let input = b"hello\r\n".to_vec();
        let mut reader = BufReader::new(&input[..]);
        assert_eq!(read_message(&mut reader, 1024).await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let input = format!("{}\n", "x".repeat(100)).into_bytes();
        let mut reader = BufReader::new(&input[..]);
        assert!(matches!(read_message(&mut reader, 10).await, Err(FramingError::Oversized)));
    }

    #[tokio::test]
    async fn invalid_utf8_is_reported_distinctly_from_oversized() {
        let mut input = b"{\"a\":\"".to_vec();
        input.push(0xFF);
        input.extend_from_slice(b"\"}\n");
        let mut reader = BufReader::new(&input[..]);
        assert!(matches!(read_message(&mut reader, 1024).await, Err(FramingError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn clean_eof_with_no_data_is_none() {
        let input: Vec<u8> = Vec::new();
        let mut reader = BufReader::new(&input[..]);
        assert_eq!(read_message(&mut reader, 1024).await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_message_appends_exactly_one_newline() {
        let mut buf: Vec<u8> = Vec::new();
        write_message(&mut buf, "{}").await.unwrap();
        assert_eq!(buf, b"{}\n");
    }
}
