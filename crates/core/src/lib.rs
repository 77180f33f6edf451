//! Core types for the credit scoring service
//!
//! This crate provides the foundational types used across all other crates:
//! - Business records keyed by GST identifier
//! - The credit record submitted for storage
//! - Conversation turns for the credit chat relay

pub mod conversation;
pub mod record;

pub use conversation::{Turn, TurnMetadata, TurnRole};
pub use record::{is_valid_table_name, BusinessRecord, CreditRecord, GST_IN_COLUMN};
