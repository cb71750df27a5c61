//! SQLite backend for the Lectern proposal engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each engine operation runs as a single
//! closure on that thread, so a decision's drift check, diff application and
//! status write never interleave with another request's writes.

mod apply;
mod baseline;
mod encode;
mod proposals;
mod review;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};
