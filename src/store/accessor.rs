//! Client handle acquisition

use std::sync::Arc;

use tracing::{error, warn};

use crate::config::{BackendKind, Config};

use super::firestore::FirestoreConnector;
use super::memory::MemoryStore;
use super::{DocumentStore, StoreError};

/// Produces a client handle for one gateway call
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError>;
}

impl Connector for MemoryStore {
    fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(Arc::new(self.clone()))
    }
}

/// Whether a record store backend exists for this process.
///
/// Decided once at startup. Handles are never cached: `client()` asks the
/// connector for a new one on every call.
#[derive(Clone)]
pub enum ClientAccessor {
    Available(Arc<dyn Connector>),
    Unavailable,
}

impl ClientAccessor {
    /// Select the backend named by the configuration
    pub fn from_config(config: &Config) -> Self {
        match config.backend {
            BackendKind::Firestore if config.firestore.project_id.is_some() => {
                Self::Available(Arc::new(FirestoreConnector::new(config.firestore.clone())))
            }
            BackendKind::Firestore => {
                warn!("Firestore backend selected but no project id configured");
                Self::Unavailable
            }
            BackendKind::Memory => Self::Available(Arc::new(MemoryStore::new())),
            BackendKind::Disabled => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Return a client handle, or `None` when there is no usable backend
    pub fn client(&self) -> Option<Arc<dyn DocumentStore>> {
        match self {
            Self::Unavailable => {
                warn!("Record store backend not configured");
                None
            }
            Self::Available(connector) => match connector.connect() {
                Ok(client) => Some(client),
                Err(e) => {
                    error!(error = %e, "Failed to create record store client");
                    None
                }
            },
        }
    }
}
