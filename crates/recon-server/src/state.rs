use std::sync::Arc;

use reconcile_core::{ReconConfig, ReconciliationStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReconciliationStore>,
    pub config: Arc<ReconConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReconciliationStore>, config: ReconConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
