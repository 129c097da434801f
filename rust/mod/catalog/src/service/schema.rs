use storeadmin_core::ServiceError;
use storeadmin_gateway::Gateway;

/// Sequence that hands out product `ml_id`s.
pub const ML_ID_SEQUENCE: &str = "products.ml_id";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        image_url TEXT,
        image_key TEXT,
        price REAL NOT NULL,
        category TEXT NOT NULL,
        gender TEXT NOT NULL,
        ml_id INTEGER NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        phone TEXT,
        height REAL,
        weight REAL,
        body_shape TEXT,
        skin_tone TEXT,
        gender TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        service TEXT NOT NULL,
        action TEXT NOT NULL,
        ml_id INTEGER NOT NULL,
        category TEXT,
        image_key TEXT,
        status TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        next_attempt_at INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_product_category ON products(category)",
    "CREATE INDEX IF NOT EXISTS idx_profile_created ON profiles(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_notif_due ON notifications(status, next_attempt_at)",
    "CREATE INDEX IF NOT EXISTS idx_notif_item ON notifications(service, ml_id)",
    // Start the ml_id sequence above anything already stored.
    "INSERT OR IGNORE INTO sequences (name, value)
        SELECT 'products.ml_id', COALESCE(MAX(ml_id), 0) FROM products",
];

pub fn init_schema(gateway: &Gateway) -> Result<(), ServiceError> {
    gateway.apply_schema(SCHEMA)
}
