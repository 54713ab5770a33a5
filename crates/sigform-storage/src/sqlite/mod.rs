//! SQLite backend.
//!
//! Split by concern: `store` owns the connection and schema lifecycle,
//! `classes` the shared primitive catalog, `forms` the per-form graph.

mod classes;
mod forms;
pub mod schema;
mod store;

pub use store::SqliteStore;
