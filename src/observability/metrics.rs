//! Metrics collection.
//!
//! # Metrics
//! - `dispatcher_requests_total` (counter): finished sessions by outcome
//! - `dispatcher_malformed_requests_total` (counter): rejected client messages
//! - `dispatcher_session_retries_total` (counter): reconnect-and-retry attempts by backend
//! - `dispatcher_session_duration_seconds` (histogram): session wall time
//! - `dispatcher_live_sessions` (gauge): sessions spawned and not yet reaped
//! - `dispatcher_schedule_seconds` (gauge): estimated queued work per backend
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no exporter or port is opened here
//! - Whoever embeds the dispatcher decides which recorder to install

use std::time::Duration;

use crate::dispatch::session::SessionOutcome;
use crate::load_balancer::backend::BackendId;

pub fn record_session(outcome: &SessionOutcome, elapsed: Duration) {
    metrics::counter!("dispatcher_requests_total", "outcome" => outcome.label()).increment(1);
    metrics::histogram!("dispatcher_session_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_malformed_request() {
    metrics::counter!("dispatcher_malformed_requests_total").increment(1);
}

pub fn record_retry(backend: BackendId) {
    metrics::counter!("dispatcher_session_retries_total", "backend" => backend.to_string())
        .increment(1);
}

pub fn record_live_sessions(live: usize) {
    metrics::gauge!("dispatcher_live_sessions").set(live as f64);
}

pub fn record_schedule(estimates: &[(BackendId, f64)]) {
    for (backend, estimate) in estimates {
        metrics::gauge!("dispatcher_schedule_seconds", "backend" => backend.to_string())
            .set(*estimate);
    }
}
