//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//! ```
//!
//! # Design Decisions
//! - Session and backend IDs flow through every log event
//! - Metrics are cheap (atomic increments behind the facade)

pub mod logging;
pub mod metrics;
