//! Length-prefixed message framing
//!
//! Wire format in both directions: a 4-byte little-endian length followed by
//! exactly that many bytes of UTF-8 JSON. Reads tolerate arbitrary transport
//! chunking; the length prefix and the payload may each arrive split across
//! any number of reads.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bound on completing a frame once its first byte has arrived
///
/// Hang protection against a peer that stops mid-frame, not a retry
/// mechanism. The idle wait for a frame to start is not bounded here.
pub const FRAME_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a declared frame length
///
/// Matches the browser native-messaging limit; a length beyond this is a
/// corrupt or hostile prefix, not a real message.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Framing failures
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Stream failure, including truncation mid-frame
    #[error("frame read/write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The frame did not complete within the bounded wait
    #[error("no complete frame within {}s", FRAME_READ_TIMEOUT.as_secs())]
    Timeout,

    /// Declared length exceeds [`MAX_FRAME_LEN`]
    #[error("declared frame length {0} exceeds the maximum")]
    Oversized(usize),

    /// Payload is not valid JSON for the expected message shape
    #[error("frame payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a message as a length-prefixed frame
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(message)?;

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Read one frame and parse its payload
///
/// Returns `Ok(None)` on a clean end-of-stream before any frame byte. Once
/// the first byte of the length prefix has arrived, the rest of the frame
/// must complete within `timeout`.
pub async fn read_message<R, T>(reader: &mut R, timeout: Duration) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];

    // First byte separately: zero bytes here is a clean shutdown, not
    // truncation.
    if reader.read(&mut len_buf[..1]).await? == 0 {
        return Ok(None);
    }

    let payload = tokio::time::timeout(timeout, async {
        reader.read_exact(&mut len_buf[1..]).await?;

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FrameError::Oversized(len));
        }

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;
        Ok(payload)
    })
    .await
    .map_err(|_| FrameError::Timeout)??;

    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Write one message as a frame and flush
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    /// Yields at most one byte per poll, exercising worst-case chunking
    struct OneBytePerRead {
        data: Vec<u8>,
        pos: usize,
    }

    impl OneBytePerRead {
        fn new(data: Vec<u8>) -> Self {
            Self { data, pos: 0 }
        }
    }

    impl AsyncRead for OneBytePerRead {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.pos < self.data.len() {
                buf.put_slice(&[self.data[self.pos]]);
                self.pos += 1;
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn round_trip() {
        let message = serde_json::json!({"command": "getPublicKey"});
        let frame = encode(&message).unwrap();

        assert_eq!(frame[..4], (frame.len() as u32 - 4).to_le_bytes());

        let mut reader = &frame[..];
        let decoded: serde_json::Value = read_message(&mut reader, FRAME_READ_TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn round_trip_one_byte_chunks() {
        // The length prefix and payload both arrive one byte at a time
        let message = serde_json::json!({"signature": "AB", "nested": [1, 2, 3]});
        let mut reader = OneBytePerRead::new(encode(&message).unwrap());

        let decoded: serde_json::Value = read_message(&mut reader, FRAME_READ_TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn clean_eof_before_any_byte() {
        let mut reader: &[u8] = &[];
        let decoded: Option<serde_json::Value> =
            read_message(&mut reader, FRAME_READ_TIMEOUT).await.unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn truncated_payload_is_an_error() {
        let mut frame = encode(&serde_json::json!({"a": 1})).unwrap();
        frame.truncate(frame.len() - 2);

        let mut reader = &frame[..];
        let result: Result<Option<serde_json::Value>, _> =
            read_message(&mut reader, FRAME_READ_TIMEOUT).await;
        assert!(matches!(result, Err(FrameError::Io(_))));
    }

    #[tokio::test]
    async fn stalled_frame_times_out() {
        // A length prefix arrives, then the stream hangs forever
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            server.write_all(&8u32.to_le_bytes()).await.unwrap();
            server.write_all(b"{").await.unwrap();
            std::future::pending::<()>().await;
        });
        let result: Result<Option<serde_json::Value>, _> =
            read_message(&mut client, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(FrameError::Timeout)));
    }

    #[tokio::test]
    async fn extra_bytes_after_frame_are_left_unread() {
        let mut frame = encode(&serde_json::json!({"a": 1})).unwrap();
        frame.extend_from_slice(b"trailing garbage");

        let mut reader = &frame[..];
        let decoded: serde_json::Value = read_message(&mut reader, FRAME_READ_TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let mut frame = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes().to_vec();
        frame.extend_from_slice(&[0u8; 16]);

        let mut reader = &frame[..];
        let result: Result<Option<serde_json::Value>, _> =
            read_message(&mut reader, FRAME_READ_TIMEOUT).await;
        assert!(matches!(result, Err(FrameError::Oversized(_))));
    }

    #[tokio::test]
    async fn malformed_json_is_a_frame_error() {
        let payload = b"not json";
        let mut frame = (payload.len() as u32).to_le_bytes().to_vec();
        frame.extend_from_slice(payload);

        let mut reader = &frame[..];
        let result: Result<Option<serde_json::Value>, _> =
            read_message(&mut reader, FRAME_READ_TIMEOUT).await;
        assert!(matches!(result, Err(FrameError::Json(_))));
    }
}
