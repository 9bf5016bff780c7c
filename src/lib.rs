//! Greedy TCP request dispatcher library.

pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;

pub use config::schema::DispatcherConfig;
pub use dispatch::Dispatcher;
pub use lifecycle::Shutdown;
