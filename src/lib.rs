//! Multi-tenant attribute index
//!
//! Entities are flattened into `path:value` strings, stored per document as
//! compressed tries, and queried with exact, wildcard, range and substring
//! terms. See [`search`] for the index itself.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod search;

pub use config::Config;
pub use error::{AppError, Result};
