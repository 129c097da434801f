//! Data store gateway.
//!
//! Generic list/count/get/insert/update/delete over named collections,
//! where a listing's total always counts the same filtered set as its page.

pub mod collection;
pub mod gateway;

pub use collection::{Collection, Record};
pub use gateway::{storage_error, Gateway, Tx};
