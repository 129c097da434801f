use serde::Serialize;

/// Inventory page summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: u64,
    pub total_categories: u64,
    /// Mean price, 0 when there are no products.
    pub average_price: f64,
    pub gender_stats: GenderStats,
    /// Distinct category labels, sorted.
    pub unique_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenderStats {
    pub male: u64,
    pub female: u64,
}

/// Dashboard landing page counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_customers: u64,
}
