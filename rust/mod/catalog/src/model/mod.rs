pub mod category;
pub mod customer;
pub mod notification;
pub mod order;
pub mod product;
pub mod stats;

pub use category::Category;
pub use customer::{Customer, NewCustomer};
pub use notification::{DeliveryStatus, Notification, NotificationQuery, NotifyAction};
pub use order::{Order, SAMPLE_ORDERS};
pub use product::{Gender, ImageUpload, NewProduct, Product, ProductChanges};
pub use stats::{DashboardStats, GenderStats, ProductStats};
