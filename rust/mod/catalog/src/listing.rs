//! Store-backed sources for [`ListingController`](storeadmin_paging::ListingController).

use std::sync::Arc;

use async_trait::async_trait;
use storeadmin_core::ServiceError;
use storeadmin_paging::{ListQuery, Page, PageSource};

use crate::model::{Customer, Product};
use crate::service::CatalogService;

/// Products, newest first. Deleting queues removal from the item services.
#[derive(Clone)]
pub struct ProductListing(pub Arc<CatalogService>);

#[async_trait]
impl PageSource for ProductListing {
    type Row = Product;

    fn row_id(row: &Product) -> &str {
        &row.id
    }

    async fn fetch(&self, query: &ListQuery) -> Result<Page<Product>, ServiceError> {
        self.0.list_products(query)
    }

    async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        self.0.delete_product(id).map(|_| ())
    }
}

#[derive(Clone)]
pub struct CustomerListing(pub Arc<CatalogService>);

#[async_trait]
impl PageSource for CustomerListing {
    type Row = Customer;

    fn row_id(row: &Customer) -> &str {
        &row.id
    }

    async fn fetch(&self, query: &ListQuery) -> Result<Page<Customer>, ServiceError> {
        self.0.list_customers(query)
    }

    async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        self.0.delete_customer(id)
    }
}
