//! Shared application state.

use std::sync::Arc;

use crate::service::ReceiptService;

/// State handed to every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The receipt service all routes delegate to.
    pub service: Arc<ReceiptService>,
}

impl AppState {
    /// Wrap a service.
    pub fn new(service: ReceiptService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
