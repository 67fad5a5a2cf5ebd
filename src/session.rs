use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::ClientError;
use crate::poller::LiveView;
use crate::types::{HistoryRecord, StoredPlate};
use crate::views::ListingLoader;
use crate::workflow::Workflow;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything one operator's console holds in memory. Nothing here outlives the process.
pub struct Session {
    pub backend: BackendClient,
    pub workflow: Mutex<Workflow>,
    pub live: LiveView,
    pub stored: ListingLoader<StoredPlate>,
    pub history: ListingLoader<HistoryRecord>,
    pub max_upload_bytes: u64,
}

impl Session {
    pub fn new(config: &Config) -> Result<Arc<Self>, ClientError> {
        let backend = BackendClient::new(config)?;
        Ok(Arc::new(Session {
            live: LiveView::new(backend.clone(), config.poll_interval),
            backend,
            workflow: Mutex::new(Workflow::new()),
            stored: ListingLoader::new(),
            history: ListingLoader::new(),
            max_upload_bytes: config.max_upload_bytes,
        }))
    }
}
