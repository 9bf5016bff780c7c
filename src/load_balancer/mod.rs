//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: config backends
//!     → registry.rs (validated, immutable id → backend table)
//!     → greedy.rs (one schedule entry per backend, all at zero)
//!
//! Per request:
//!     → greedy.rs decays every estimate by the elapsed time
//!     → weighted cost = estimate + duration * weight(class, kind)
//!     → lowest cost wins, lowest id breaks ties
//!     → winner's estimate becomes its cost
//! ```
//!
//! # Design Decisions
//! - Scheduler is owned by the dispatch loop; no locks on scheduling state
//! - Estimates are the dispatcher's own bookkeeping, never measured load
//! - Backend table is fixed for the process lifetime

pub mod backend;
pub mod greedy;
pub mod registry;

pub use backend::{Backend, BackendId, ServiceClass};
pub use greedy::{GreedyScheduler, Selection};
pub use registry::{BackendRegistry, RegistryError};
