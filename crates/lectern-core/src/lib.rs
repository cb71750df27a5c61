//! Core types and trait definitions for the Lectern proposal engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod diff;
pub mod error;
pub mod proposal;
pub mod record;
pub mod scope;
pub mod snapshot;
pub mod store;

pub use error::{ApplyError, Error, Operation, Result};
