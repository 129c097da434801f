use serde::{Deserialize, Serialize};
use storeadmin_core::MAX_PAGE_SIZE;

/// What to tell an item-matching service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifyAction {
    Register,
    Remove,
}

impl NotifyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Remove => "REMOVE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "REGISTER" => Some(Self::Register),
            "REMOVE" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Delivery state of an outbox row.
///
/// ```text
/// PENDING → DELIVERING → DELIVERED
///                      → PENDING    (attempt failed, retry later)
///                      → FAILED     (attempts exhausted)
/// FAILED  → PENDING                 (manual retry)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Delivering,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Delivering => "DELIVERING",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "DELIVERING" => Some(Self::Delivering),
            "DELIVERED" => Some(Self::Delivered),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending or finished delivery to one item-matching service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub service: String,
    pub action: NotifyAction,
    pub ml_id: i64,
    pub category: Option<String>,
    pub image_key: Option<String>,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Unix seconds; not claimed before this.
    pub next_attempt_at: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// `?status=FAILED&page=1&pageSize=20`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub status: Option<DeliveryStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl NotificationQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;

    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Requested size, default 20, capped at [`MAX_PAGE_SIZE`].
    pub fn effective_page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}
