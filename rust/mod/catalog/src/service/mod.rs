pub mod customer;
pub mod order;
pub mod product;
pub mod schema;
pub mod stats;

use std::sync::Arc;

use storeadmin_blob::{AssetStorage, BlobError};
use storeadmin_core::ServiceError;
use storeadmin_gateway::Gateway;
use tokio::sync::Notify;

use crate::outbox::OutboxStore;

/// Catalog service: products, customers, categories, orders and the
/// notification outbox behind them.
pub struct CatalogService {
    pub(crate) gateway: Gateway,
    pub(crate) assets: Arc<AssetStorage>,
    pub(crate) image_bucket: String,
    /// Item-matching services every product change is queued for.
    pub(crate) item_services: Vec<String>,
    pub(crate) outbox: OutboxStore,
    pub(crate) outbox_wake: Arc<Notify>,
}

impl CatalogService {
    pub fn new(
        gateway: Gateway,
        assets: Arc<AssetStorage>,
        image_bucket: impl Into<String>,
        item_services: Vec<String>,
    ) -> Result<Self, ServiceError> {
        schema::init_schema(&gateway)?;
        Ok(Self {
            outbox: OutboxStore::new(gateway.clone()),
            gateway,
            assets,
            image_bucket: image_bucket.into(),
            item_services,
            outbox_wake: Arc::new(Notify::new()),
        })
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn assets(&self) -> &Arc<AssetStorage> {
        &self.assets
    }

    pub fn outbox(&self) -> &OutboxStore {
        &self.outbox
    }

    /// Notified whenever new outbox rows are committed.
    pub fn outbox_wake(&self) -> Arc<Notify> {
        Arc::clone(&self.outbox_wake)
    }
}

pub(crate) fn asset_error(e: BlobError) -> ServiceError {
    match e {
        BlobError::InvalidKey(msg) => ServiceError::Validation(msg),
        BlobError::Io(msg) => ServiceError::Storage(msg),
    }
}
