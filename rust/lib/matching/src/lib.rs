//! Client for the external item-matching services.
//!
//! Each service keeps its own index of catalog items keyed by the product's
//! numeric `ml_id`. All of them speak the same small HTTP protocol:
//!
//! - `POST {endpoint}/api/v1/items`, multipart fields `id`, `category`, `image`
//! - `DELETE {endpoint}/api/v1/items/{id}`
//!
//! Any 2xx answer is success; response bodies are not interpreted.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("{service}: HTTP {status}: {message}")]
    Server {
        service: String,
        status: u16,
        message: String,
    },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request: {0}")]
    Request(String),
}

// ── ItemService ─────────────────────────────────────────────────────

/// An item to add to a matching service's index.
#[derive(Debug, Clone)]
pub struct ItemRegistration {
    pub ml_id: i64,
    pub category: String,
    /// Sent as the `image` part; omitted when the product has no image.
    pub image: Option<ItemImage>,
}

#[derive(Debug, Clone)]
pub struct ItemImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ItemService: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn register(&self, item: &ItemRegistration) -> Result<(), MatchingError>;

    async fn remove(&self, ml_id: i64) -> Result<(), MatchingError>;
}

/// [`ItemService`] over HTTP.
pub struct HttpItemService {
    name: String,
    endpoint: String,
    http: reqwest::Client,
}

impl HttpItemService {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MatchingError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check(&self, resp: reqwest::Response) -> Result<(), MatchingError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let message = resp.text().await.unwrap_or_default();
        Err(MatchingError::Server {
            service: self.name.clone(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ItemService for HttpItemService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn register(&self, item: &ItemRegistration) -> Result<(), MatchingError> {
        let mut form = Form::new()
            .text("id", item.ml_id.to_string())
            .text("category", item.category.clone());
        if let Some(image) = &item.image {
            let mut part = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
            if let Some(ct) = &image.content_type {
                part = part
                    .mime_str(ct)
                    .map_err(|e| MatchingError::Request(format!("content type {}: {}", ct, e)))?;
            }
            form = form.part("image", part);
        }

        let url = format!("{}/api/v1/items", self.endpoint);
        debug!(service = %self.name, ml_id = item.ml_id, "register item");
        let resp = self.http.post(&url).multipart(form).send().await?;
        self.check(resp).await
    }

    async fn remove(&self, ml_id: i64) -> Result<(), MatchingError> {
        let url = format!("{}/api/v1/items/{}", self.endpoint, ml_id);
        debug!(service = %self.name, ml_id, "remove item");
        let resp = self.http.delete(&url).send().await?;
        self.check(resp).await
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// The configured services, by name.
#[derive(Clone, Default)]
pub struct ItemServices {
    by_name: BTreeMap<String, Arc<dyn ItemService>>,
}

impl ItemServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP clients for `(name, endpoint)` pairs.
    pub fn from_endpoints<'a>(
        endpoints: impl IntoIterator<Item = (&'a str, &'a str)>,
        timeout: Duration,
    ) -> Result<Self, MatchingError> {
        let mut services = Self::new();
        for (name, endpoint) in endpoints {
            services.insert(Arc::new(HttpItemService::new(name, endpoint, timeout)?));
        }
        Ok(services)
    }

    /// Add a service, replacing any with the same name.
    pub fn insert(&mut self, service: Arc<dyn ItemService>) {
        self.by_name.insert(service.name().to_string(), service);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ItemService>> {
        self.by_name.get(name).cloned()
    }

    /// Service names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
