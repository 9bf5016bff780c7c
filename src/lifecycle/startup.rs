//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect to every backend before accepting clients
//! - Bind the client listener
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when the backend pool is ready)

use crate::config::DispatcherConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::listener::Listener;

/// Start the dispatcher and run it until `shutdown` fires.
pub async fn run(config: &DispatcherConfig, shutdown: &Shutdown) -> Result<(), DispatchError> {
    tracing::info!(backends = config.backends.len(), "Connecting to backends");
    let dispatcher = Dispatcher::connect(config).await?;

    let listener = Listener::bind(&config.listener).await?;

    dispatcher.run(listener, shutdown.subscribe()).await
}
