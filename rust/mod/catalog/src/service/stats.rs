use storeadmin_core::{now_unix, ServiceError};
use storeadmin_paging::Page;
use storeadmin_sql::Row;
use tracing::info;

use super::CatalogService;
use crate::model::{
    Category, Customer, DashboardStats, GenderStats, Notification, NotificationQuery, Product,
    ProductStats,
};

fn count_col(row: &Row, column: &str) -> u64 {
    row.get_i64(column)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

impl CatalogService {
    /// Categories derived from product labels, sorted by name. Blank labels
    /// are skipped.
    pub fn categories(&self) -> Result<Vec<Category>, ServiceError> {
        let rows = self.gateway.query(
            "SELECT category, COUNT(*) AS cnt FROM products
             WHERE TRIM(category) <> ''
             GROUP BY category ORDER BY category ASC",
            &[],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(Category {
                    name: r.get_str("category")?.to_string(),
                    count: count_col(r, "cnt"),
                })
            })
            .collect())
    }

    pub fn product_stats(&self) -> Result<ProductStats, ServiceError> {
        let totals = self.gateway.query(
            "SELECT COUNT(*) AS cnt, COALESCE(AVG(price), 0.0) AS avg_price,
                    SUM(CASE WHEN gender = 'Male' THEN 1 ELSE 0 END) AS male,
                    SUM(CASE WHEN gender = 'Female' THEN 1 ELSE 0 END) AS female
             FROM products",
            &[],
        )?;
        let (total_products, average_price, gender_stats) = match totals.first() {
            Some(r) => (
                count_col(r, "cnt"),
                r.get_f64("avg_price").unwrap_or(0.0),
                GenderStats {
                    male: count_col(r, "male"),
                    female: count_col(r, "female"),
                },
            ),
            None => (0, 0.0, GenderStats::default()),
        };

        let unique_categories: Vec<String> = self
            .categories()?
            .into_iter()
            .map(|c| c.name)
            .collect();

        Ok(ProductStats {
            total_products,
            total_categories: unique_categories.len() as u64,
            average_price,
            gender_stats,
            unique_categories,
        })
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        Ok(DashboardStats {
            total_products: self.gateway.count::<Product>(None)?,
            total_customers: self.gateway.count::<Customer>(None)?,
        })
    }

    pub fn list_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Page<Notification>, ServiceError> {
        self.outbox.list(query)
    }

    /// Put a FAILED notification back in the queue and wake the worker.
    pub fn retry_notification(&self, id: &str) -> Result<Notification, ServiceError> {
        let n = self.outbox.retry(id, now_unix())?;
        info!(id, service = %n.service, ml_id = n.ml_id, "notification requeued");
        self.outbox_wake.notify_one();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeliveryStatus, NewCustomer, NewProduct};
    use crate::service::tests::{service, service_with};

    fn add(svc: &CatalogService, name: &str, price: f64, category: &str, gender: &str) {
        svc.create_product(
            NewProduct {
                name: name.into(),
                price,
                category: category.into(),
                gender: gender.into(),
            },
            None,
        )
        .unwrap();
    }

    #[test]
    fn empty_catalog_stats() {
        let (svc, _dir) = service();
        let stats = svc.product_stats().unwrap();
        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.total_categories, 0);
        assert_eq!(stats.average_price, 0.0);
        assert_eq!(stats.gender_stats, GenderStats::default());
        assert!(stats.unique_categories.is_empty());
        assert!(svc.categories().unwrap().is_empty());
    }

    #[test]
    fn stats_and_categories() {
        let (svc, _dir) = service();
        add(&svc, "Silk Dress", 80.0, "Dresses", "female");
        add(&svc, "Wrap Dress", 60.0, "Dresses", "Female");
        add(&svc, "Oxford", 40.0, "Shirts", "male");

        let stats = svc.product_stats().unwrap();
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.total_categories, 2);
        assert!((stats.average_price - 60.0).abs() < 1e-9);
        assert_eq!(stats.gender_stats, GenderStats { male: 1, female: 2 });
        assert_eq!(stats.unique_categories, vec!["Dresses", "Shirts"]);

        let cats = svc.categories().unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].name, "Dresses");
        assert_eq!(cats[0].count, 2);
        assert_eq!(cats[1].count, 1);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["genderStats"]["Female"], 2);
    }

    #[test]
    fn dashboard_counts() {
        let (svc, _dir) = service();
        add(&svc, "Oxford", 40.0, "Shirts", "male");
        svc.create_customer(NewCustomer::default()).unwrap();
        svc.create_customer(NewCustomer::default()).unwrap();
        assert_eq!(
            svc.dashboard_stats().unwrap(),
            DashboardStats {
                total_products: 1,
                total_customers: 2
            }
        );
    }

    #[test]
    fn retry_only_applies_to_failed_rows() {
        let (svc, _dir) = service_with(&["outfit"]);
        add(&svc, "Oxford", 40.0, "Shirts", "male");
        let queued = svc.list_notifications(&NotificationQuery::default()).unwrap();
        let n = &queued.rows[0];
        assert_eq!(n.status, DeliveryStatus::Pending);
        assert!(matches!(svc.retry_notification(&n.id), Err(ServiceError::Conflict(_))));
        assert!(matches!(svc.retry_notification("missing"), Err(ServiceError::NotFound(_))));
    }
}
