use serde::Serialize;

/// A product category label and how many products carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub count: u64,
}
