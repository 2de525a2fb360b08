//! Outbound TCP connection to the relay target.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::target::RelayTarget;

/// Open a TCP connection to `target`, giving up after `timeout`.
///
/// Returns the connected stream together with how long the connect took.
pub async fn connect_upstream(target: &RelayTarget, timeout: Duration) -> Result<(TcpStream, Duration), RelayError> {
    let started = Instant::now();
    let connect = TcpStream::connect((target.host(), target.port()));

    let stream = match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            tracing::debug!(target = %target, error = %source, "Upstream connect failed");
            return Err(RelayError::UpstreamUnreachable {
                target: target.clone(),
                source,
            });
        }
        Err(_) => {
            tracing::debug!(target = %target, timeout_ms = timeout.as_millis() as u64, "Upstream connect timed out");
            return Err(RelayError::UpstreamTimeout {
                target: target.clone(),
                after: timeout,
            });
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(target = %target, error = %e, "Failed to set TCP_NODELAY");
    }

    let elapsed = started.elapsed();
    metrics::record_connect(elapsed);
    tracing::debug!(target = %target, latency_us = elapsed.as_micros() as u64, "Upstream connected");
    Ok((stream, elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let target = RelayTarget::new("127.0.0.1", addr.port()).unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        let (stream, _) = connect_upstream(&target, Duration::from_secs(1)).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn refused_port_is_unreachable() {
        // Bind then drop to get a port that is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = RelayTarget::new("127.0.0.1", port).unwrap();
        let err = connect_upstream(&target, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RelayError::UpstreamUnreachable { .. }));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
