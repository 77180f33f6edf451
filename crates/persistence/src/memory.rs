//! In-memory record store
//!
//! Backs tests and local runs without a database. Rows are kept per table
//! in insertion order; lookups return the first match like the SQL backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use creditai_core::{BusinessRecord, CreditRecord};

use crate::error::StoreError;
use crate::records::RecordStore;
use crate::schema::checked_table;

#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, Vec<BusinessRecord>>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed of one row
    pub fn with_record(self, table: &str, record: BusinessRecord) -> Self {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(record);
        self
    }

    /// Make every call fail with a connection error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of gateway calls served (including failed ones)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Rows currently held for a table
    pub fn rows(&self, table: &str) -> Vec<BusinessRecord> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    fn begin(&self, table: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        checked_table(table)?;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_by_gst(&self, table: &str, gst_in: &str) -> Result<BusinessRecord, StoreError> {
        self.begin(table)?;
        self.tables
            .read()
            .get(table)
            .and_then(|rows| rows.iter().find(|r| r.gst_in() == Some(gst_in)))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                gst_in: gst_in.to_string(),
            })
    }

    async fn insert_credit_record(
        &self,
        table: &str,
        record: &CreditRecord,
    ) -> Result<(), StoreError> {
        self.begin(table)?;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(record.to_business_record());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unavailable".to_string()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
