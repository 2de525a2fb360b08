//! Shared utilities for relay integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ws_relay::config::RelayConfig;
use ws_relay::http::HttpServer;
use ws_relay::lifecycle::Shutdown;
use ws_relay::net::connection::SessionTracker;

/// A TCP upstream that echoes every byte back. Counts accepted connections.
pub async fn start_echo_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = accepts.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });

    (addr, accepts)
}

/// A TCP upstream that accepts and immediately closes.
pub async fn start_closing_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = accepts.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    (addr, accepts)
}

/// A TCP upstream that records everything it receives until EOF.
pub async fn start_sink_upstream() -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut received = Vec::new();
                let _ = socket.read_to_end(&mut received).await;
                let _ = tx.send(received);
            });
        }
    });

    (addr, rx)
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub struct RelayHandle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub sessions: SessionTracker,
    pub task: JoinHandle<std::io::Result<()>>,
}

impl RelayHandle {
    pub fn ws_url(&self, path_and_query: &str) -> String {
        format!("ws://{}{}", self.addr, path_and_query)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the relay on an ephemeral port with the given upstream as its
/// fixed remote.
pub async fn start_relay_to(upstream: SocketAddr) -> RelayHandle {
    let mut config = RelayConfig::default();
    config.relay.remote = Some(upstream.to_string());
    start_relay(config).await
}

pub async fn start_relay(mut config: RelayConfig) -> RelayHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let sessions = server.sessions().clone();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });

    RelayHandle {
        addr,
        shutdown,
        sessions,
        task,
    }
}
