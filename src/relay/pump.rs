//! The two byte pumps of a relay session.
//!
//! Each pump borrows one source and one destination and loops
//! read → write until the source ends or either side fails. Pumps never
//! close what they borrow; teardown belongs to the session.
//!
//! ```text
//!  client frames ──▶ client_to_upstream ──▶ upstream bytes
//!  client frames ◀── upstream_to_client ◀── upstream bytes
//! ```

use axum::body::Bytes;
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::relay::error::PumpError;
use crate::relay::latch::CloseReason;
use crate::relay::stats::{Direction, SessionStats};

/// Map the end of a pump to the reason recorded on the session latch.
pub fn close_reason(direction: Direction, result: &Result<(), PumpError>) -> CloseReason {
    match result {
        Ok(()) => match direction {
            Direction::Inbound => CloseReason::ClientClosed,
            Direction::Outbound => CloseReason::UpstreamClosed,
        },
        Err(PumpError::Client(_)) => CloseReason::ClientError,
        Err(PumpError::Upstream(_)) => CloseReason::UpstreamError,
    }
}

/// Client → upstream. Binary and text payloads are written verbatim;
/// control frames carry nothing for the upstream. Returns on close frame or
/// end of stream.
pub async fn client_to_upstream<S, W>(
    client: &mut S,
    upstream: &mut W,
    stats: &SessionStats,
) -> Result<(), PumpError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(message) = client.next().await {
        let written = match message? {
            Message::Binary(data) => {
                upstream.write_all(&data).await?;
                data.len()
            }
            Message::Text(text) => {
                let data = text.as_str().as_bytes();
                upstream.write_all(data).await?;
                data.len()
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(frame) => {
                tracing::debug!(frame = ?frame, "Client sent close frame");
                return Ok(());
            }
        };
        if written > 0 {
            upstream.flush().await?;
            stats.record(Direction::Inbound, written);
        }
    }
    Ok(())
}

/// Upstream → client. Every read becomes one binary frame.
pub async fn upstream_to_client<R, K>(
    upstream: &mut R,
    client: &mut K,
    buffer_size: usize,
    stats: &SessionStats,
) -> Result<(), PumpError>
where
    R: AsyncRead + Unpin,
    K: Sink<Message, Error = axum::Error> + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = upstream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        client.send(Message::Binary(Bytes::copy_from_slice(&buf[..n]))).await?;
        stats.record(Direction::Outbound, n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tokio::io::duplex;

    fn ok(message: Message) -> Result<Message, axum::Error> {
        Ok(message)
    }

    #[tokio::test]
    async fn inbound_preserves_order_and_content() {
        let mut client = stream::iter(vec![
            ok(Message::Binary(Bytes::from_static(b"he"))),
            ok(Message::Ping(Bytes::from_static(b"p"))),
            ok(Message::Text("llo ".into())),
            ok(Message::Binary(Bytes::from_static(b"world"))),
        ]);
        let (mut upstream, mut far_end) = duplex(64);
        let stats = SessionStats::new();

        client_to_upstream(&mut client, &mut upstream, &stats).await.unwrap();
        drop(upstream);

        let mut received = Vec::new();
        far_end.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello world");
        assert_eq!(stats.bytes_up(), 11);
    }

    #[tokio::test]
    async fn inbound_stops_at_close_frame() {
        let mut client = stream::iter(vec![
            ok(Message::Binary(Bytes::from_static(b"a"))),
            ok(Message::Close(None)),
            ok(Message::Binary(Bytes::from_static(b"never"))),
        ]);
        let (mut upstream, mut far_end) = duplex(64);
        let stats = SessionStats::new();

        client_to_upstream(&mut client, &mut upstream, &stats).await.unwrap();
        drop(upstream);

        let mut received = Vec::new();
        far_end.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"a");
    }

    #[tokio::test]
    async fn inbound_client_error_is_tagged() {
        let mut client = stream::iter(vec![Err(axum::Error::new(std::io::Error::other("reset")))]);
        let (mut upstream, _far_end) = duplex(64);
        let stats = SessionStats::new();

        let result = client_to_upstream(&mut client, &mut upstream, &stats).await;
        assert!(matches!(result, Err(PumpError::Client(_))));
        assert_eq!(close_reason(Direction::Inbound, &result), CloseReason::ClientError);
    }

    #[tokio::test]
    async fn inbound_upstream_write_failure_is_tagged() {
        let mut client = stream::iter(vec![ok(Message::Binary(Bytes::from_static(b"x")))]);
        let (mut upstream, far_end) = duplex(64);
        drop(far_end);
        let stats = SessionStats::new();

        let result = client_to_upstream(&mut client, &mut upstream, &stats).await;
        assert!(matches!(result, Err(PumpError::Upstream(_))));
        assert_eq!(close_reason(Direction::Inbound, &result), CloseReason::UpstreamError);
    }

    #[tokio::test]
    async fn outbound_frames_every_read_in_order() {
        let (mut upstream, mut far_end) = duplex(64);
        let (tx, rx) = futures_channel::mpsc::unbounded::<Message>();
        let mut client = tx.sink_map_err(axum::Error::new);
        let stats = SessionStats::new();

        far_end.write_all(b"abc").await.unwrap();
        far_end.write_all(b"def").await.unwrap();
        drop(far_end);

        upstream_to_client(&mut upstream, &mut client, 4, &stats).await.unwrap();
        drop(client);

        let frames: Vec<Message> = rx.collect().await;
        let mut joined = Vec::new();
        for frame in frames {
            match frame {
                Message::Binary(data) => {
                    assert!(data.len() <= 4);
                    joined.extend_from_slice(&data);
                }
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(joined, b"abcdef");
        assert_eq!(stats.bytes_down(), 6);
    }

    #[tokio::test]
    async fn outbound_client_failure_is_tagged() {
        let (mut upstream, mut far_end) = duplex(64);
        let (tx, rx) = futures_channel::mpsc::unbounded::<Message>();
        drop(rx);
        let mut client = tx.sink_map_err(axum::Error::new);
        let stats = SessionStats::new();

        far_end.write_all(b"data").await.unwrap();

        let result = upstream_to_client(&mut upstream, &mut client, 16, &stats).await;
        assert!(matches!(result, Err(PumpError::Client(_))));
        assert_eq!(close_reason(Direction::Outbound, &result), CloseReason::ClientError);
    }

    #[test]
    fn clean_ends_map_to_peer_closed() {
        assert_eq!(close_reason(Direction::Inbound, &Ok(())), CloseReason::ClientClosed);
        assert_eq!(close_reason(Direction::Outbound, &Ok(())), CloseReason::UpstreamClosed);
    }
}
