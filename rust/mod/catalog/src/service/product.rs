use storeadmin_core::{new_id, now_rfc3339, now_unix, ServiceError};
use storeadmin_paging::{ListQuery, Page};
use storeadmin_sql::Value;
use tracing::{info, warn};

use super::schema::ML_ID_SEQUENCE;
use super::{asset_error, CatalogService};
use crate::model::product::{validate_category, validate_gender, validate_name, validate_price};
use crate::model::{ImageUpload, NewProduct, NotifyAction, Product, ProductChanges};
use crate::outbox::{enqueue, ItemRef};

/// A stored image: public URL plus the blob key it lives under.
struct StoredImage {
    url: String,
    key: String,
    bucket: String,
    object: String,
}

impl CatalogService {
    pub fn create_product(
        &self,
        input: NewProduct,
        image: Option<ImageUpload>,
    ) -> Result<Product, ServiceError> {
        let name = validate_name(&input.name)?;
        let category = validate_category(&input.category)?;
        let price = validate_price(input.price)?;
        let gender = validate_gender(&input.gender)?;

        let stored = image.map(|img| self.store_image(&img)).transpose()?;

        let now = now_rfc3339();
        let result = self.gateway.transaction(|tx| {
            let rows = tx.query("SELECT COALESCE(MAX(ml_id), 0) AS max_id FROM products", &[])?;
            let floor = rows.first().and_then(|r| r.get_i64("max_id")).unwrap_or(0);
            let ml_id = tx.next_sequence(ML_ID_SEQUENCE, floor)?;

            let product = Product {
                id: new_id(),
                name: name.clone(),
                image_url: stored.as_ref().map(|s| s.url.clone()),
                image_key: stored.as_ref().map(|s| s.key.clone()),
                price,
                category: category.clone(),
                gender,
                ml_id,
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            tx.insert(&product)?;
            enqueue(
                tx,
                &self.item_services,
                NotifyAction::Register,
                ItemRef {
                    ml_id,
                    category: Some(&product.category),
                    image_key: product.image_key.as_deref(),
                },
                now_unix(),
            )?;
            Ok(product)
        });

        match result {
            Ok(product) => {
                info!(id = %product.id, ml_id = product.ml_id, "product created");
                self.outbox_wake.notify_one();
                Ok(product)
            }
            Err(e) => {
                if let Some(s) = &stored {
                    self.discard_image(s);
                }
                Err(e)
            }
        }
    }

    pub fn get_product(&self, id: &str) -> Result<Product, ServiceError> {
        self.gateway.get(id)
    }

    /// Newest first; search covers name, category, gender and `ml_id`.
    pub fn list_products(&self, query: &ListQuery) -> Result<Page<Product>, ServiceError> {
        self.gateway.list(query)
    }

    /// Apply a partial edit and optionally replace the image.
    ///
    /// The previous image is kept on disk: queued notifications may still
    /// refer to it.
    pub fn update_product(
        &self,
        id: &str,
        changes: ProductChanges,
        image: Option<ImageUpload>,
    ) -> Result<Product, ServiceError> {
        let mut sets: Vec<(&str, Value)> = Vec::new();
        if let Some(name) = &changes.name {
            sets.push(("name", Value::from(validate_name(name)?)));
        }
        if let Some(price) = changes.price {
            sets.push(("price", Value::Real(validate_price(price)?)));
        }
        if let Some(category) = &changes.category {
            sets.push(("category", Value::from(validate_category(category)?)));
        }
        if let Some(gender) = &changes.gender {
            sets.push(("gender", Value::from(validate_gender(gender)?.as_str())));
        }
        if sets.is_empty() && image.is_none() {
            return self.get_product(id);
        }

        // Fail fast on a missing product before uploading anything.
        self.get_product(id)?;
        let stored = image.map(|img| self.store_image(&img)).transpose()?;
        if let Some(s) = &stored {
            sets.push(("image_url", Value::from(s.url.as_str())));
            sets.push(("image_key", Value::from(s.key.as_str())));
        }
        sets.push(("updated_at", Value::from(now_rfc3339())));

        let result = self.gateway.transaction(|tx| {
            tx.update::<Product>(id, &sets)?;
            tx.get::<Product>(id)
        });
        if result.is_err() {
            if let Some(s) = &stored {
                self.discard_image(s);
            }
        } else {
            info!(id, "product updated");
        }
        result
    }

    /// Delete a product and queue its removal from the item services.
    pub fn delete_product(&self, id: &str) -> Result<Product, ServiceError> {
        let removed = self.gateway.transaction(|tx| {
            let product: Product = tx.get(id)?;
            tx.delete::<Product>(id)?;
            enqueue(
                tx,
                &self.item_services,
                NotifyAction::Remove,
                ItemRef {
                    ml_id: product.ml_id,
                    category: Some(&product.category),
                    image_key: None,
                },
                now_unix(),
            )?;
            Ok(product)
        })?;
        info!(id, ml_id = removed.ml_id, "product deleted");
        self.outbox_wake.notify_one();
        Ok(removed)
    }

    fn store_image(&self, image: &ImageUpload) -> Result<StoredImage, ServiceError> {
        if image.bytes.is_empty() {
            return Err(ServiceError::Validation("image file is empty".into()));
        }
        let object = image_object_name(
            chrono::Utc::now().timestamp_millis(),
            &new_id(),
            &image.extension(),
        );
        self.assets
            .upload(&self.image_bucket, &object, &image.bytes)
            .map_err(asset_error)?;
        Ok(StoredImage {
            url: self.assets.public_url(&self.image_bucket, &object),
            key: format!("{}/{}", self.image_bucket, object),
            bucket: self.image_bucket.clone(),
            object,
        })
    }

    fn discard_image(&self, image: &StoredImage) {
        if let Err(e) = self.assets.remove(&image.bucket, &image.object) {
            warn!(key = %image.key, "failed to remove orphaned image: {e}");
        }
    }
}

/// `product_{unix_millis}_{suffix}.{ext}`; the suffix keeps two uploads in
/// the same millisecond apart.
fn image_object_name(millis: i64, id: &str, ext: &str) -> String {
    let suffix: String = id.chars().take(8).collect();
    format!("product_{}_{}.{}", millis, suffix, ext)
}
