//! Forwarding session: one request, one backend exchange, one reply.
//!
//! # State Transitions
//! ```text
//! Created → Sending → WaitingResponse → Relaying → Done
//!              │              │
//!              └──── I/O error ────→ RetryConnect → RetrySending → RetryWaitingResponse → Relaying
//!                                         │              │                  │
//!                                         └────────── I/O error ────────────┴──→ Failed
//! ```
//!
//! The client connection is closed on every path. A failed session sends
//! the client nothing; the closed connection is the only signal.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::dispatch::request::Request;
use crate::load_balancer::backend::Backend;
use crate::net::tracker::SessionId;
use crate::net::upstream::UpstreamConnection;
use crate::observability::metrics;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Sending,
    WaitingResponse,
    RetryConnect,
    RetrySending,
    RetryWaitingResponse,
    Relaying,
    Done,
    Failed,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The backend's reply was written to the client.
    Delivered { bytes: usize, retried: bool },
    /// The client connection was closed without a reply.
    Failed,
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Delivered { retried: false, .. } => "delivered",
            SessionOutcome::Delivered { retried: true, .. } => "delivered_after_retry",
            SessionOutcome::Failed => "failed",
        }
    }
}

/// Binds one client connection, one backend connection and one request.
#[derive(Debug)]
pub struct ForwardingSession {
    id: SessionId,
    client: TcpStream,
    peer: SocketAddr,
    backend: Arc<Backend>,
    upstream: Arc<UpstreamConnection>,
    request: Request,
    buffer_size: usize,
    state: SessionState,
}

impl ForwardingSession {
    pub fn new(
        client: TcpStream,
        peer: SocketAddr,
        backend: Arc<Backend>,
        upstream: Arc<UpstreamConnection>,
        request: Request,
        buffer_size: usize,
    ) -> Self {
        Self {
            id: SessionId::next(),
            client,
            peer,
            backend,
            upstream,
            request,
            buffer_size,
            state: SessionState::Created,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion. Never returns an error; failures
    /// are logged and reported through the outcome.
    pub async fn run(mut self) -> SessionOutcome {
        let started = Instant::now();

        let outcome = self.forward().await;

        if let Err(e) = self.client.shutdown().await {
            tracing::trace!(session_id = %self.id, error = %e, "Client shutdown failed");
        }

        metrics::record_session(&outcome, started.elapsed());
        tracing::debug!(
            session_id = %self.id,
            peer_addr = %self.peer,
            backend = %self.backend.id,
            outcome = outcome.label(),
            "Session finished"
        );

        outcome
    }

    async fn forward(&mut self) -> SessionOutcome {
        let mut buf = vec![0u8; self.buffer_size];

        let (received, retried) = match self.exchange(&mut buf).await {
            Ok(n) => (n, false),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.id,
                    backend = %self.backend.id,
                    backend_addr = %self.backend.addr,
                    error = %e,
                    "Backend connection lost, retrying on a fresh connection"
                );
                metrics::record_retry(self.backend.id);

                match self.retry(&mut buf).await {
                    Ok(n) => (n, true),
                    Err(e) => {
                        self.transition(SessionState::Failed);
                        tracing::error!(
                            session_id = %self.id,
                            backend = %self.backend.id,
                            backend_addr = %self.backend.addr,
                            error = %e,
                            "Retry failed, closing client without a response"
                        );
                        return SessionOutcome::Failed;
                    }
                }
            }
        };

        tracing::debug!(
            session_id = %self.id,
            backend = %self.backend.id,
            response = %String::from_utf8_lossy(&buf[..received]),
            "Backend responded"
        );

        self.transition(SessionState::Relaying);
        if let Err(e) = self.client.write_all(&buf[..received]).await {
            self.transition(SessionState::Failed);
            tracing::warn!(
                session_id = %self.id,
                peer_addr = %self.peer,
                error = %e,
                "Failed to relay response to client"
            );
            return SessionOutcome::Failed;
        }

        self.transition(SessionState::Done);
        SessionOutcome::Delivered {
            bytes: received,
            retried,
        }
    }

    /// Send and receive once on the shared backend connection.
    async fn exchange(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.transition(SessionState::Sending);
        self.upstream.send(self.request.payload()).await?;

        self.transition(SessionState::WaitingResponse);
        self.upstream.recv(buf).await
    }

    /// Close the shared connection and repeat the exchange once on a
    /// connection owned by this session.
    async fn retry(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.transition(SessionState::RetryConnect);
        self.upstream.close();
        let fresh = UpstreamConnection::connect(self.backend.addr).await?;

        self.transition(SessionState::RetrySending);
        fresh.send(self.request.payload()).await?;

        self.transition(SessionState::RetryWaitingResponse);
        fresh.recv(buf).await
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(session_id = %self.id, from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }
}
