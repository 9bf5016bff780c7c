//! Static backend registry.
//!
//! # Responsibilities
//! - Build the backend table once from configuration
//! - Resolve backend ids to address and service class
//! - Reject empty or ambiguous tables before serving starts

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::load_balancer::backend::{Backend, BackendId};

/// Errors raised while building the registry. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("backend table is empty")]
    Empty,

    #[error("duplicate backend id {0}")]
    DuplicateId(BackendId),

    #[error("backend {id} has invalid address '{address}'")]
    InvalidAddress { id: BackendId, address: String },
}

/// Immutable mapping from backend id to backend, iterated in ascending id order.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    backends: BTreeMap<BackendId, Arc<Backend>>,
}

impl BackendRegistry {
    /// Build a registry from already-resolved backends.
    pub fn new(backends: Vec<Backend>) -> Result<Self, RegistryError> {
        if backends.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut table = BTreeMap::new();
        for backend in backends {
            let id = backend.id;
            if table.insert(id, Arc::new(backend)).is_some() {
                return Err(RegistryError::DuplicateId(id));
            }
        }

        Ok(Self { backends: table })
    }

    /// Build a registry from configuration entries.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, RegistryError> {
        let backends = configs
            .iter()
            .map(|config| -> Result<Backend, RegistryError> {
                let id = BackendId(config.id);
                let addr: SocketAddr =
                    config
                        .address
                        .parse()
                        .map_err(|_| RegistryError::InvalidAddress {
                            id,
                            address: config.address.clone(),
                        })?;
                Ok(Backend::new(id, addr, config.class))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(backends)
    }

    /// Look up a backend by id.
    pub fn resolve(&self, id: BackendId) -> Option<&Arc<Backend>> {
        self.backends.get(&id)
    }

    /// All backends in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Backend>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
