use std::sync::Arc;

use crate::{barcode::BarcodeStore, config::AppConfig, store::InventoryStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub barcodes: BarcodeStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn InventoryStore>, config: AppConfig) -> Self {
        Self {
            store,
            barcodes: BarcodeStore::new(config.barcode_dir.clone()),
            config: Arc::new(config),
        }
    }
}
