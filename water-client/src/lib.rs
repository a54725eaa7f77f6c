//! Domain types and persistence for the water consumption tracker.

pub mod db;
pub mod domain;
pub mod store;

pub use db::PgStore;
pub use store::{MemoryStore, ReadingTx, StoreError, WaterStore};
