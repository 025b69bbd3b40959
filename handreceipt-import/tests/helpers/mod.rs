//! Test Helper Utilities
//!
//! Shared utilities for testing handreceipt-import

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;

pub use db_utils::{create_test_db, table_count};
pub use fakes::{MemoryInventory, MemoryLedger, StaticCatalog};

use handreceipt_import::models::CandidateItem;

/// Candidate with name, serial list and quantity
pub fn candidate(name: &str, serials: Option<&str>, quantity: i64) -> CandidateItem {
    CandidateItem {
        nsn: None,
        name: Some(name.to_string()),
        serial_number: serials.map(str::to_string),
        quantity: Some(quantity),
        confidence: Some(0.9),
        form_reference: None,
    }
}

pub fn with_nsn(mut item: CandidateItem, nsn: &str) -> CandidateItem {
    item.nsn = Some(nsn.to_string());
    item
}
