//! Import services
//!
//! The orchestrator composes the rest: quantity expansion, NSN enrichment
//! (catalog client plus retrying enricher) and the audit ledger writer.

pub mod batch_orchestrator;
pub mod ledger_writer;
pub mod nsn_client;
pub mod nsn_enricher;
pub mod quantity_expander;

pub use batch_orchestrator::{BatchImportOrchestrator, OrchestratorSettings};
pub use ledger_writer::{AuditLedgerWriter, CreatedUnitSummary};
pub use nsn_client::{NsnCatalogClient, NsnClientError};
pub use nsn_enricher::{EnrichmentOutcome, NsnEnricher};
pub use quantity_expander::{split_serials, Expansion, QuantityExpander};
