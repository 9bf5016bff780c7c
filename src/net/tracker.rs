//! Live-session tracking.
//!
//! # Responsibilities
//! - Number sessions in dispatch order for tracing
//! - Own the join handles of every in-flight forwarding session
//! - Reap finished sessions without blocking the accept loop
//! - Drain sessions on shutdown

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};

use crate::dispatch::session::SessionOutcome;
use crate::observability::metrics;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Sequence number of a forwarding session, in dispatch order.
///
/// Shown as `session-N` in every log line the session emits, so one
/// client's request can be followed from accept to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Take the next number in the process-wide sequence.
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Registry of in-flight sessions.
///
/// Sessions are independent tasks; the tracker only observes their
/// completion. It plays no part in routing.
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: JoinSet<(SessionId, SessionOutcome)>,
}

impl SessionTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a session on its own task.
    pub fn spawn<F>(&mut self, id: SessionId, session: F)
    where
        F: Future<Output = SessionOutcome> + Send + 'static,
    {
        self.sessions.spawn(async move { (id, session.await) });
        metrics::record_live_sessions(self.sessions.len());
    }

    /// Collect every session that has already finished. Never waits.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.sessions.try_join_next() {
            record_completion(result);
            reaped += 1;
        }
        if reaped > 0 {
            metrics::record_live_sessions(self.sessions.len());
        }
        reaped
    }

    /// Number of sessions spawned and not yet reaped.
    pub fn live(&self) -> usize {
        self.sessions.len()
    }

    /// Wait for in-flight sessions to finish, aborting whatever is still
    /// running after `timeout`. Returns the number of aborted sessions.
    pub async fn drain(&mut self, timeout: Duration) -> usize {
        tracing::info!(live_sessions = self.sessions.len(), "Draining sessions");

        let finished = tokio::time::timeout(timeout, join_all(&mut self.sessions)).await;

        let aborted = match finished {
            Ok(()) => 0,
            Err(_) => {
                let remaining = self.sessions.len();
                tracing::warn!(remaining, "Drain timeout reached, aborting sessions");
                self.sessions.shutdown().await;
                remaining
            }
        };

        metrics::record_live_sessions(0);
        aborted
    }
}

async fn join_all(sessions: &mut JoinSet<(SessionId, SessionOutcome)>) {
    while let Some(result) = sessions.join_next().await {
        record_completion(result);
    }
}

fn record_completion(result: Result<(SessionId, SessionOutcome), JoinError>) {
    match result {
        Ok((id, outcome)) => {
            tracing::trace!(session_id = %id, outcome = outcome.label(), "Session reaped");
        }
        Err(e) if e.is_cancelled() => {
            tracing::debug!("Session cancelled");
        }
        Err(e) => {
            tracing::error!(error = %e, "Session task panicked");
        }
    }
}
