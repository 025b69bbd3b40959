//! Collaborator Traits and Error Types
//!
//! The reconciliation core holds no durable state. Everything it reads or
//! writes goes through the capabilities defined here:
//! - **Extractor:** OCR/AI document → raw lines
//! - **ExistingInventoryLookup:** serial already on the books?
//! - **PropertyStore:** atomic per-unit create, best-effort enrichment write
//! - **NsnCatalog:** NSN → catalog details
//! - **Ledger:** append-only audit sink
//!
//! SQLite and HTTP implementations live in `db` and `services`; tests swap in
//! in-memory fakes.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{LedgerEntry, LedgerReceipt, NsnDetails, NsnLookup, RawLine, ValidatedUnit};

// ============================================================================
// Extraction
// ============================================================================

/// OCR/AI extraction backend
///
/// ```rust,ignore
/// use handreceipt_import::types::{Extractor, ExtractionError};
///
/// struct VisionService { /* http client */ }
///
/// #[async_trait::async_trait]
/// impl Extractor for VisionService {
///     fn name(&self) -> &'static str { "vision" }
///
///     async fn extract(&self, document: &[u8]) -> Result<Vec<RawLine>, ExtractionError> {
///         // POST the scan, map the returned lines
///         todo!()
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Extractor name for provenance logging
    fn name(&self) -> &'static str;

    /// Produce ordered raw lines for a scanned document
    async fn extract(&self, document: &[u8]) -> Result<Vec<RawLine>, ExtractionError>;
}

/// Extraction error
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Document could not be read or decoded
    #[error("Unreadable document: {0}")]
    Unreadable(String),

    /// Backend unreachable
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an error
    #[error("Extraction service error: {0}")]
    Service(String),

    /// Backend response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

// ============================================================================
// Property store
// ============================================================================

/// Serial number existence check against the target inventory
#[async_trait::async_trait]
pub trait ExistingInventoryLookup: Send + Sync {
    async fn exists(&self, serial_number: &str) -> Result<bool, StoreError>;
}

/// Durable property storage
#[async_trait::async_trait]
pub trait PropertyStore: Send + Sync {
    /// Insert the property and its import metadata as one unit of work
    ///
    /// A serial uniqueness violation must surface as `StoreError::Duplicate`.
    async fn create_atomic(&self, unit: &ValidatedUnit, holder: &str) -> Result<Uuid, StoreError>;

    /// Attach catalog details to an existing property (descriptive fields only)
    async fn attach_enrichment(
        &self,
        property_id: Uuid,
        details: &NsnDetails,
    ) -> Result<(), StoreError>;
}

/// Property store error
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Serial number already present
    #[error("Serial number already exists: {0}")]
    Duplicate(String),

    /// Any other persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// NSN catalog
// ============================================================================

/// External NSN catalog
///
/// One call is one attempt; retries and timeouts are applied by the
/// `NsnEnricher` wrapping it.
#[async_trait::async_trait]
pub trait NsnCatalog: Send + Sync {
    async fn lookup(&self, nsn: &str) -> NsnLookup;
}

// ============================================================================
// Ledger
// ============================================================================

/// Append-only audit ledger
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    async fn append(&self, entry: &LedgerEntry) -> Result<LedgerReceipt, LedgerError>;
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger rejected entry: {0}")]
    Rejected(String),
}

// ============================================================================
// Batch-level errors
// ============================================================================

/// Batch-fatal error, returned before any unit is attempted
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Batch contains no items")]
    EmptyBatch,

    #[error("Batch has {count} items (max {max})")]
    TooManyItems { count: usize, max: usize },

    #[error("Request must carry either rawLines or candidates, not both")]
    AmbiguousInput,

    #[error("Request has no actor")]
    MissingActor,

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}
