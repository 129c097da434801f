//! Bucket/object view over a [`BlobStore`], with public URLs.
//!
//! An object `a.png` in bucket `product-images` is stored under the blob
//! key `product-images/a.png` and published at
//! `{public_base}/product-images/a.png`.

use std::sync::Arc;

use tracing::debug;

use crate::error::BlobError;
use crate::traits::BlobStore;

pub struct AssetStorage {
    blob: Arc<dyn BlobStore>,
    public_base: String,
}

impl AssetStorage {
    /// `public_base` is the URL prefix under which buckets are served,
    /// e.g. `http://localhost:8080/assets`.
    pub fn new(blob: Arc<dyn BlobStore>, public_base: &str) -> Self {
        Self {
            blob,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Store `data` as `object` in `bucket`, replacing any previous content.
    pub fn upload(&self, bucket: &str, object: &str, data: &[u8]) -> Result<(), BlobError> {
        let key = object_key(bucket, object)?;
        self.blob.put(&key, data)?;
        debug!(bucket, object, bytes = data.len(), "asset uploaded");
        Ok(())
    }

    /// Read an object back. `None` when it does not exist.
    pub fn read(&self, bucket: &str, object: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.blob.get(&object_key(bucket, object)?)
    }

    /// Remove an object. No-op when it does not exist.
    pub fn remove(&self, bucket: &str, object: &str) -> Result<(), BlobError> {
        self.blob.delete(&object_key(bucket, object)?)
    }

    /// Read by full blob key (`bucket/object`), as recorded in outbox rows.
    pub fn read_key(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let (bucket, object) = split_key(key)?;
        self.read(bucket, object)
    }

    /// Public URL of an object. Does not check that it exists.
    pub fn public_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, object)
    }
}

/// Blob key for an object: `{bucket}/{object}`.
pub fn object_key(bucket: &str, object: &str) -> Result<String, BlobError> {
    if bucket.is_empty() || bucket.contains('/') || bucket.starts_with('.') {
        return Err(BlobError::InvalidKey(format!("bucket {:?}", bucket)));
    }
    if object.is_empty() {
        return Err(BlobError::InvalidKey("empty object name".into()));
    }
    Ok(format!("{}/{}", bucket, object))
}

/// MIME type for an object name, by extension. `None` when unknown.
pub fn content_type_for(object: &str) -> Option<&'static str> {
    let ext = object.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn split_key(key: &str) -> Result<(&str, &str), BlobError> {
    key.split_once('/')
        .ok_or_else(|| BlobError::InvalidKey(format!("{:?} has no bucket", key)))
}
