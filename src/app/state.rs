//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::RecordStoreGateway;
use crate::store::ClientAccessor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub records: RecordStoreGateway,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Backend is chosen once; handles are acquired per call
        let accessor = ClientAccessor::from_config(&config);
        let records = RecordStoreGateway::new(accessor);

        Self { config, records }
    }
}
