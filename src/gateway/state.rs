use std::sync::Arc;

use crate::store::Store;

/// Shared handler state: the injected store handle and nothing else
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}
