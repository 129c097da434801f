pub mod api;
pub mod listing;
pub mod model;
pub mod outbox;
pub mod service;
pub mod store_impls;

use std::sync::{Arc, Mutex};

use axum::Router;
use storeadmin_core::Module;
use storeadmin_matching::ItemServices;
use tokio_util::sync::CancellationToken;
use tracing::info;

use outbox::{OutboxConfig, OutboxWorker};
use service::CatalogService;

/// Catalog module: products, customers, categories, orders, and delivery of
/// product changes to the item-matching services.
pub struct CatalogModule {
    service: Arc<CatalogService>,
    worker: Arc<OutboxWorker>,
    worker_token: Mutex<Option<CancellationToken>>,
}

impl CatalogModule {
    pub fn new(service: CatalogService, services: ItemServices, config: OutboxConfig) -> Self {
        let service = Arc::new(service);
        let worker = Arc::new(OutboxWorker::new(
            service.outbox().clone(),
            services,
            Arc::clone(service.assets()),
            config,
        ));
        Self {
            service,
            worker,
            worker_token: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &Arc<CatalogService> {
        &self.service
    }

    /// Start the outbox delivery loop. Must be called inside a tokio
    /// runtime; a second call is a no-op.
    pub fn start(&self) {
        let Ok(mut token) = self.worker_token.lock() else {
            return;
        };
        if token.is_none() {
            *token = Some(outbox::start(
                Arc::clone(&self.worker),
                self.service.outbox_wake(),
            ));
            info!("catalog outbox worker started");
        }
    }

    /// Stop the outbox loop after its current batch.
    pub fn shutdown(&self) {
        if let Ok(mut token) = self.worker_token.lock() {
            if let Some(token) = token.take() {
                token.cancel();
                info!("catalog outbox worker stopped");
            }
        }
    }
}

impl Module for CatalogModule {
    fn name(&self) -> &str {
        "catalog"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
