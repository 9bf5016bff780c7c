//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted client
//!     → engine.rs (single read of the request on the control task)
//!     → request.rs (parse type + duration, reject malformed)
//!     → load_balancer::greedy (decay, weighted cost, pick backend)
//!     → session.rs (spawned task: send, receive once, relay, close)
//! ```
//!
//! # Design Decisions
//! - Selection is serialized on the control task, forwarding is concurrent
//! - Sessions retry once on a fresh connection and then fail silently
//! - Responses are relayed from a single bounded read, without framing

pub mod engine;
pub mod request;
pub mod session;

pub use engine::{DispatchError, Dispatcher};
pub use request::{Request, RequestError, RequestKind};
pub use session::{ForwardingSession, SessionOutcome, SessionState};
