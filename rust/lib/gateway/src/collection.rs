use storeadmin_core::ServiceError;
use storeadmin_sql::{Row, Value};

/// A named table the gateway can list, write and search.
#[derive(Debug, Clone, Copy)]
pub struct Collection {
    /// Table name.
    pub name: &'static str,
    /// Every stored column, `id` first. Also the order of [`Record::values`].
    pub columns: &'static [&'static str],
    /// SQL expressions matched case-insensitively against the search text,
    /// OR-combined. Non-text columns need a cast, e.g. `CAST(ml_id AS TEXT)`.
    pub search: &'static [&'static str],
    /// `ORDER BY` clause used for listings.
    pub order_by: &'static str,
}

impl Collection {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// Comma-separated column list for `SELECT`.
    pub fn select_list(&self) -> String {
        self.columns.join(", ")
    }
}

/// A row type stored in one [`Collection`].
pub trait Record: Sized {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Column values in [`Collection::columns`] order.
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row) -> Result<Self, ServiceError>;
}

// ── Row decoding helpers ──

fn missing(column: &str) -> ServiceError {
    ServiceError::Internal(format!("missing column {column}"))
}

pub fn text(row: &Row, column: &str) -> Result<String, ServiceError> {
    row.get_str(column)
        .map(str::to_string)
        .ok_or_else(|| missing(column))
}

/// Text column that may be NULL. NULL and absent both read as `None`.
pub fn opt_text(row: &Row, column: &str) -> Option<String> {
    row.get_str(column).map(str::to_string)
}

pub fn integer(row: &Row, column: &str) -> Result<i64, ServiceError> {
    row.get_i64(column).ok_or_else(|| missing(column))
}

pub fn opt_integer(row: &Row, column: &str) -> Option<i64> {
    row.get_i64(column)
}

pub fn real(row: &Row, column: &str) -> Result<f64, ServiceError> {
    row.get_f64(column).ok_or_else(|| missing(column))
}

pub fn opt_real(row: &Row, column: &str) -> Option<f64> {
    row.get_f64(column)
}
