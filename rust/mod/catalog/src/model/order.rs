use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: &'static str,
    pub customer: &'static str,
    pub date: &'static str,
    pub status: &'static str,
    pub total: f64,
}

/// Orders are not stored yet; the dashboard shows this fixed sample.
pub const SAMPLE_ORDERS: &[Order] = &[
    Order {
        id: "#1001",
        customer: "Sophia Clark",
        date: "2024-07-26",
        status: "Shipped",
        total: 75.00,
    },
    Order {
        id: "#1002",
        customer: "Ethan Carter",
        date: "2024-07-25",
        status: "Processing",
        total: 120.00,
    },
    Order {
        id: "#1003",
        customer: "Olivia Bennett",
        date: "2024-07-24",
        status: "Delivered",
        total: 50.00,
    },
    Order {
        id: "#1004",
        customer: "Liam Harper",
        date: "2024-07-23",
        status: "Shipped",
        total: 90.00,
    },
    Order {
        id: "#1005",
        customer: "Ava Foster",
        date: "2024-07-22",
        status: "Delivered",
        total: 60.00,
    },
];

impl Order {
    /// Case-insensitive substring match on id, customer and status.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [self.id, self.customer, self.status]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
