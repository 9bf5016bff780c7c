//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use greedy_dispatcher::config::{BackendConfig, DispatcherConfig};
use greedy_dispatcher::dispatch::{DispatchError, Dispatcher};
use greedy_dispatcher::lifecycle::Shutdown;
use greedy_dispatcher::load_balancer::ServiceClass;
use greedy_dispatcher::net::listener::Listener;

/// A mock backend listening on an ephemeral port.
pub struct MockBackend {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Number of TCP connections the backend has accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Start a backend whose connections stay open and answer every request.
///
/// The first `hangups` accepted connections read one request and then close
/// without replying.
pub async fn start_backend<F>(hangups: usize, reply: F) -> MockBackend
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let reply = Arc::new(reply);

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let reply = reply.clone();
            tokio::spawn(serve_connection(socket, index < hangups, reply));
        }
    });

    MockBackend { addr, accepted }
}

async fn serve_connection<F>(mut socket: TcpStream, hang_up: bool, reply: Arc<F>)
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    let mut buf = [0u8; 1024];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        if hang_up {
            return;
        }
        if socket.write_all(&(*reply)(&buf[..n])).await.is_err() {
            return;
        }
    }
}

/// Start a healthy backend that answers `"<tag>:<request>"`.
pub async fn start_tagged_backend(tag: &'static str) -> MockBackend {
    start_backend(0, move |request| {
        format!("{tag}:{}", String::from_utf8_lossy(request)).into_bytes()
    })
    .await
}

/// Build a config pointing at the given backend addresses.
pub fn config_for(backends: &[(u32, SocketAddr, ServiceClass)]) -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.lifecycle.drain_timeout_secs = 1;
    for (id, addr, class) in backends {
        config.backends.push(BackendConfig {
            id: *id,
            address: addr.to_string(),
            class: *class,
        });
    }
    config
}

/// A dispatcher running on its own task.
pub struct RunningDispatcher {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), DispatchError>>,
}

/// Connect, bind and start serving.
pub async fn start_dispatcher(config: DispatcherConfig) -> RunningDispatcher {
    let dispatcher = Dispatcher::connect(&config).await.unwrap();
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let handle = tokio::spawn(async move { dispatcher.run(listener, signal).await });

    RunningDispatcher {
        addr,
        shutdown,
        handle,
    }
}

/// Send one request and collect everything the dispatcher sends back before closing.
pub async fn send_request(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    response
}
