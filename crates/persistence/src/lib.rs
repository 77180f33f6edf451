//! Record store gateway for the credit scoring service
//!
//! Provides:
//! - Parameterized lookup of one business row by GST identifier
//! - Parameterized insert of credit records, creating the table on demand
//! - A MySQL backend (sqlx pool) and an in-memory backend for tests

pub mod client;
pub mod error;
pub mod memory;
pub mod records;
pub mod schema;

pub use client::{MySqlClient, MySqlConfig};
pub use error::StoreError;
pub use memory::InMemoryRecordStore;
pub use records::{MySqlRecordStore, RecordStore};

use creditai_config::DatabaseConfig;

/// Build the MySQL record store from settings
///
/// The pool connects lazily, so an unreachable database surfaces as a
/// per-request `StoreError::Connection` rather than a startup failure.
pub fn init(config: &DatabaseConfig) -> Result<MySqlRecordStore, StoreError> {
    let client = MySqlClient::connect_lazy(MySqlConfig::try_from(config)?);
    Ok(MySqlRecordStore::new(client))
}
