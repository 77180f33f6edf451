//! Record store errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No record in {table} for GST_IN {gst_in}")]
    NotFound { table: String, gst_in: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
            sqlx::Error::Configuration(_) => StoreError::Configuration(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}
