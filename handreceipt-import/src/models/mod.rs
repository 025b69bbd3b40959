//! Data models for the hand receipt import pipeline

pub mod import_request;
pub mod import_result;
pub mod items;
pub mod ledger_entry;
pub mod nsn;

pub use import_request::{BatchImportRequest, ImportContext, UnitInfo};
pub use import_result::{
    AdapterNote, BatchImportResult, EnrichmentStatus, ImportOutcome, LedgerWarning,
    OutcomeReason, OutcomeStatus, OverallStatus, ReasonCode,
};
pub use items::{
    CandidateItem, ImportMetadata, ImportSource, LinePosition, ParsedItem, RawLine, SerialSource,
    ValidatedUnit,
};
pub use ledger_entry::{ConfidenceBands, LedgerEntry, LedgerReceipt};
pub use nsn::{NsnDetails, NsnLookup};
