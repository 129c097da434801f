use storeadmin_core::{new_id, now_rfc3339, ServiceError};
use storeadmin_paging::{ListQuery, Page};
use tracing::info;

use super::CatalogService;
use crate::model::{Customer, NewCustomer};

fn clean(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn measurement(name: &str, value: Option<f64>) -> Result<Option<f64>, ServiceError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(ServiceError::Validation(format!(
            "{} must be a positive number",
            name
        ))),
        other => Ok(other),
    }
}

impl CatalogService {
    /// Insert a profile. The storefront normally owns these; the dashboard
    /// uses this for imports and fixtures.
    pub fn create_customer(&self, input: NewCustomer) -> Result<Customer, ServiceError> {
        let customer = Customer {
            id: new_id(),
            phone: clean(input.phone),
            height: measurement("height", input.height)?,
            weight: measurement("weight", input.weight)?,
            body_shape: clean(input.body_shape),
            skin_tone: clean(input.skin_tone),
            gender: clean(input.gender),
            created_at: now_rfc3339(),
        };
        self.gateway.insert(&customer)?;
        Ok(customer)
    }

    pub fn get_customer(&self, id: &str) -> Result<Customer, ServiceError> {
        self.gateway.get(id)
    }

    pub fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>, ServiceError> {
        self.gateway.list(query)
    }

    pub fn delete_customer(&self, id: &str) -> Result<(), ServiceError> {
        self.gateway.delete::<Customer>(id)?;
        info!(id, "customer deleted");
        Ok(())
    }

    pub fn count_customers(&self) -> Result<u64, ServiceError> {
        self.gateway.count::<Customer>(None)
    }
}
