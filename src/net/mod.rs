//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → hand off to the dispatch engine
//!
//! Backend side:
//!     upstream.rs (one persistent connection per backend, shared by sessions)
//!
//! Session lifetimes:
//!     tracker.rs (join handles of in-flight sessions, reaping, draining)
//! ```
//!
//! # Design Decisions
//! - No accept-side backpressure: every accepted request gets a session
//! - Upstream connections are opened once and shared, not pooled
//! - Sessions are tracked for observability and shutdown draining only

pub mod listener;
pub mod tracker;
pub mod upstream;
