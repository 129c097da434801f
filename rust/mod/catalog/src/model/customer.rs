use serde::{Deserialize, Serialize};

/// A shopper profile. Written by the storefront; the dashboard reads and
/// deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub phone: Option<String>,
    /// Centimetres.
    pub height: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    pub body_shape: Option<String>,
    pub skin_tone: Option<String>,
    pub gender: Option<String>,
    pub created_at: String,
}

/// Input for creating a customer profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub phone: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub body_shape: Option<String>,
    pub skin_tone: Option<String>,
    pub gender: Option<String>,
}
