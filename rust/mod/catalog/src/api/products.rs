use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use storeadmin_core::{ListParams, ServiceError};
use storeadmin_paging::PageView;

use super::{list_query, page_view, AppState};
use crate::model::{ImageUpload, NewProduct, Product, ProductChanges, ProductStats};

/// Largest accepted product form, image included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/stats", get(product_stats))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Fields of the add/edit product form. Everything is optional here; the
/// handlers decide what is required.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    price: Option<f64>,
    category: Option<String>,
    gender: Option<String>,
    image: Option<ImageUpload>,
}

fn bad_form(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(format!("invalid form: {}", e))
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm, ServiceError> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_form)?;
                // Browsers send an empty file part when nothing was picked.
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        file_name,
                        content_type,
                    });
                }
            }
            "name" | "price" | "category" | "gender" => {
                let text = field.text().await.map_err(bad_form)?;
                match name.as_str() {
                    "name" => form.name = Some(text),
                    "category" => form.category = Some(text),
                    "gender" => form.gender = Some(text),
                    _ => {
                        let price = text.trim().parse::<f64>().map_err(|_| {
                            ServiceError::Validation(format!("price is not a number: {:?}", text))
                        })?;
                        form.price = Some(price);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::Validation(format!("{} is required", field)))
}

async fn create_product(
    State(svc): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>), ServiceError> {
    let form = read_form(multipart).await?;
    let input = NewProduct {
        name: required(form.name, "name")?,
        price: required(form.price, "price")?,
        category: required(form.category, "category")?,
        gender: required(form.gender, "gender")?,
    };
    let product = svc.create_product(input, form.image)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(
    State(svc): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageView<Product>>, ServiceError> {
    let query = list_query(&params);
    let page = svc.list_products(&query)?;
    Ok(Json(page_view(page, &query)))
}

async fn get_product(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ServiceError> {
    Ok(Json(svc.get_product(&id)?))
}

async fn update_product(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>, ServiceError> {
    let form = read_form(multipart).await?;
    let changes = ProductChanges {
        name: form.name,
        price: form.price,
        category: form.category,
        gender: form.gender,
    };
    Ok(Json(svc.update_product(&id, changes, form.image)?))
}

async fn delete_product(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.delete_product(&id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn product_stats(State(svc): State<AppState>) -> Result<Json<ProductStats>, ServiceError> {
    Ok(Json(svc.product_stats()?))
}
