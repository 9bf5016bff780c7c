//! The dispatch engine.
//!
//! # Responsibilities
//! - Open one persistent connection per backend at startup (fail fast)
//! - Accept clients and read their single request on the control task
//! - Pick a backend with the greedy scheduler
//! - Spawn a forwarding session per request and reap finished ones
//!
//! Accepting, parsing and selection happen strictly one at a time on the
//! task running [`Dispatcher::run`]. Forwarding happens on session tasks
//! that never touch scheduling state.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::DispatcherConfig;
use crate::dispatch::request::Request;
use crate::dispatch::session::ForwardingSession;
use crate::load_balancer::backend::BackendId;
use crate::load_balancer::greedy::GreedyScheduler;
use crate::load_balancer::registry::{BackendRegistry, RegistryError};
use crate::net::listener::{Listener, ListenerError};
use crate::net::tracker::SessionTracker;
use crate::net::upstream::UpstreamConnection;
use crate::observability::metrics;

/// Errors that stop the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid backend table: {0}")]
    Registry(#[from] RegistryError),

    #[error("backend {id} at {addr} is unreachable: {source}")]
    BackendUnreachable {
        id: BackendId,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Owns the backend connections, the schedule and the live sessions.
#[derive(Debug)]
pub struct Dispatcher {
    registry: BackendRegistry,
    upstreams: BTreeMap<BackendId, Arc<UpstreamConnection>>,
    scheduler: GreedyScheduler,
    sessions: SessionTracker,
    buffer_size: usize,
    drain_timeout: Duration,
}

impl Dispatcher {
    /// Build the registry and connect to every backend.
    ///
    /// Any unreachable backend aborts startup; the dispatcher never serves
    /// with a partial pool.
    pub async fn connect(config: &DispatcherConfig) -> Result<Self, DispatchError> {
        let registry = BackendRegistry::from_config(&config.backends)?;

        let mut upstreams = BTreeMap::new();
        for backend in registry.iter() {
            let upstream = UpstreamConnection::connect(backend.addr)
                .await
                .map_err(|source| DispatchError::BackendUnreachable {
                    id: backend.id,
                    addr: backend.addr,
                    source,
                })?;

            tracing::info!(
                backend = %backend.id,
                class = %backend.class,
                backend_addr = %backend.addr,
                "Connected to backend"
            );
            upstreams.insert(backend.id, Arc::new(upstream));
        }

        let scheduler = GreedyScheduler::new(&registry);

        Ok(Self {
            registry,
            upstreams,
            scheduler,
            sessions: SessionTracker::new(),
            buffer_size: config.session.buffer_size,
            drain_timeout: Duration::from_secs(config.lifecycle.drain_timeout_secs),
        })
    }

    /// Serve clients until a shutdown signal arrives, then drain sessions.
    pub async fn run(
        mut self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), DispatchError> {
        let address = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %address,
            backends = self.registry.len(),
            "Dispatcher serving"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.dispatch(stream, peer).await,
                        Err(e) => tracing::error!(error = %e, "Accept failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Dispatcher received shutdown signal, no longer accepting");
                    break;
                }
            }
        }

        let aborted = self.sessions.drain(self.drain_timeout).await;
        tracing::info!(aborted, "Dispatcher stopped");
        Ok(())
    }

    /// Handle one accepted client: read, parse, select, spawn.
    pub async fn dispatch(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        let mut buf = vec![0u8; self.buffer_size];
        let received = match stream.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(peer_addr = %peer, error = %e, "Failed to read client request");
                return;
            }
        };
        let raw = &buf[..received];

        tracing::info!(
            peer_addr = %peer,
            request = %String::from_utf8_lossy(raw).trim(),
            "Client sent request"
        );

        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    peer_addr = %peer,
                    request = %String::from_utf8_lossy(raw),
                    error = %e,
                    "Malformed request"
                );
                metrics::record_malformed_request();
                let _ = stream.shutdown().await;
                return;
            }
        };

        let Some(selection) = self.scheduler.select(&request) else {
            tracing::error!(peer_addr = %peer, "No backends to schedule on");
            return;
        };
        let (Some(backend), Some(upstream)) = (
            self.registry.resolve(selection.backend),
            self.upstreams.get(&selection.backend),
        ) else {
            tracing::error!(backend = %selection.backend, "Scheduled backend is not registered");
            return;
        };

        tracing::info!(
            request = %request,
            backend = %selection.backend,
            class = %selection.class,
            expected_time = selection.expected_time,
            "Delegated request"
        );
        metrics::record_schedule(&self.scheduler.estimates());

        let session = ForwardingSession::new(
            stream,
            peer,
            Arc::clone(backend),
            Arc::clone(upstream),
            request,
            self.buffer_size,
        );
        self.sessions.spawn(session.id(), session.run());
        self.sessions.reap();
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &GreedyScheduler {
        &self.scheduler
    }

    /// Sessions spawned and not yet reaped.
    pub fn live_sessions(&self) -> usize {
        self.sessions.live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::load_balancer::backend::ServiceClass;
    use tokio::net::TcpListener;

    async fn idle_backend() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    async fn hanging_up_backend() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 64];
                    let _ = socket.read(&mut buf).await;
                });
            }
        });
        addr
    }

    async fn client_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, server, peer)
    }

    async fn dispatcher() -> Dispatcher {
        let mut config = DispatcherConfig::default();
        for (id, class) in [(0, ServiceClass::Video), (1, ServiceClass::Music)] {
            config.backends.push(BackendConfig {
                id,
                address: idle_backend().await.to_string(),
                class,
            });
        }
        Dispatcher::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_malformed_request_closes_client_and_leaves_schedule_untouched() {
        let mut dispatcher = dispatcher().await;
        let (mut client, server, peer) = client_pair().await;

        client.write_all(b"3").await.unwrap();
        dispatcher.dispatch(server, peer).await;

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());
        assert_eq!(dispatcher.live_sessions(), 0);
        for (_, estimate) in dispatcher.scheduler().estimates() {
            assert_eq!(estimate, 0.0);
        }
    }

    #[tokio::test]
    async fn test_well_formed_request_updates_schedule_and_spawns_session() {
        let mut dispatcher = dispatcher().await;
        let (mut client, server, peer) = client_pair().await;

        client.write_all(b"M4").await.unwrap();
        dispatcher.dispatch(server, peer).await;

        let estimate = dispatcher.scheduler().estimate(BackendId(1)).unwrap();
        assert!(estimate > 3.9 && estimate <= 4.0);
        assert_eq!(dispatcher.scheduler().estimate(BackendId(0)), Some(0.0));
        assert_eq!(dispatcher.live_sessions(), 1);
    }

    #[tokio::test]
    async fn test_failed_session_keeps_its_schedule_estimate() {
        let mut config = DispatcherConfig::default();
        config.backends.push(BackendConfig {
            id: 0,
            address: hanging_up_backend().await.to_string(),
            class: ServiceClass::Video,
        });
        config.backends.push(BackendConfig {
            id: 1,
            address: idle_backend().await.to_string(),
            class: ServiceClass::Music,
        });
        let mut dispatcher = Dispatcher::connect(&config).await.unwrap();
        let (mut client, server, peer) = client_pair().await;

        client.write_all(b"V4").await.unwrap();
        dispatcher.dispatch(server, peer).await;

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());

        // Both attempts failed; the estimate stays at the cost charged on selection.
        assert_eq!(dispatcher.scheduler().estimate(BackendId(0)), Some(4.0));
        assert_eq!(dispatcher.scheduler().estimate(BackendId(1)), Some(0.0));
    }

    #[tokio::test]
    async fn test_unreachable_backend_aborts_startup() {
        let closed = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let mut config = DispatcherConfig::default();
        config.backends.push(BackendConfig {
            id: 0,
            address: idle_backend().await.to_string(),
            class: ServiceClass::Video,
        });
        config.backends.push(BackendConfig {
            id: 1,
            address: closed.to_string(),
            class: ServiceClass::Music,
        });

        let err = Dispatcher::connect(&config).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::BackendUnreachable { id: BackendId(1), .. }
        ));
    }
}
