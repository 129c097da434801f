//! Durable fan-out to the item-matching services.
//!
//! Product writes queue one notification row per service in the same
//! transaction; the worker delivers them afterwards with retry.

pub mod store;
pub mod worker;

pub use store::{enqueue, ItemRef, OutboxStore};
pub use worker::{start, DeliveryReport, OutboxConfig, OutboxWorker};
