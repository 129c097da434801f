use storeadmin_core::ServiceError;
use storeadmin_paging::{ListQuery, Page};

use super::CatalogService;
use crate::model::{Order, SAMPLE_ORDERS};

impl CatalogService {
    /// Orders come from the fixed sample set, filtered and paged in memory
    /// the same way stored listings are.
    pub fn list_orders(&self, query: &ListQuery) -> Result<Page<Order>, ServiceError> {
        let matching: Vec<&Order> = match query.search.as_deref() {
            Some(needle) => SAMPLE_ORDERS.iter().filter(|o| o.matches(needle)).collect(),
            None => SAMPLE_ORDERS.iter().collect(),
        };
        let range = query.range();
        let offset = usize::try_from(range.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(range.limit()).unwrap_or(usize::MAX);
        let rows = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|o| (*o).clone())
            .collect();
        Ok(Page {
            rows,
            total: matching.len() as u64,
        })
    }
}
