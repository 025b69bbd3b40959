//! In-memory collaborators for orchestrator tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use handreceipt_import::models::{LedgerEntry, LedgerReceipt, NsnDetails, NsnLookup, ValidatedUnit};
use handreceipt_import::types::{
    ExistingInventoryLookup, Ledger, LedgerError, NsnCatalog, PropertyStore, StoreError,
};

#[derive(Debug, Clone)]
pub struct CreatedProperty {
    pub id: Uuid,
    pub unit: ValidatedUnit,
    pub holder: String,
}

/// Inventory + store backed by a serial set
#[derive(Default)]
pub struct MemoryInventory {
    serials: Mutex<HashSet<String>>,
    created: Mutex<Vec<CreatedProperty>>,
    enrichments: Mutex<HashMap<Uuid, NsnDetails>>,
    failing_serials: HashSet<String>,
    delays: HashMap<String, Duration>,
    cancel_after: Option<(usize, CancellationToken)>,
    stale_lookup: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(serials: &[&str]) -> Self {
        let inventory = Self::default();
        inventory
            .serials
            .lock()
            .unwrap()
            .extend(serials.iter().map(|s| s.to_string()));
        inventory
    }

    /// `create_atomic` fails with a storage error for this serial
    pub fn failing_on(mut self, serial: &str) -> Self {
        self.failing_serials.insert(serial.to_string());
        self
    }

    /// `create_atomic` sleeps before committing this serial
    pub fn delayed(mut self, serial: &str, delay: Duration) -> Self {
        self.delays.insert(serial.to_string(), delay);
        self
    }

    /// Cancel `token` once `count` properties have been created
    pub fn cancelling_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    /// `exists` always answers false, as if another writer inserted the
    /// serial between the lookup and `create_atomic`
    pub fn stale_lookup(mut self) -> Self {
        self.stale_lookup = true;
        self
    }

    pub fn created(&self) -> Vec<CreatedProperty> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_serials(&self) -> Vec<String> {
        self.created()
            .into_iter()
            .map(|p| p.unit.serial_number)
            .collect()
    }

    pub fn enrichment(&self, property_id: Uuid) -> Option<NsnDetails> {
        self.enrichments.lock().unwrap().get(&property_id).cloned()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExistingInventoryLookup for MemoryInventory {
    async fn exists(&self, serial_number: &str) -> Result<bool, StoreError> {
        if self.stale_lookup {
            return Ok(false);
        }
        Ok(self.serials.lock().unwrap().contains(serial_number))
    }
}

#[async_trait]
impl PropertyStore for MemoryInventory {
    async fn create_atomic(&self, unit: &ValidatedUnit, holder: &str) -> Result<Uuid, StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&unit.serial_number) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_serials.contains(&unit.serial_number) {
            return Err(StoreError::Storage("disk full".to_string()));
        }
        if !self.serials.lock().unwrap().insert(unit.serial_number.clone()) {
            return Err(StoreError::Duplicate(unit.serial_number.clone()));
        }

        let id = Uuid::new_v4();
        let count = {
            let mut created = self.created.lock().unwrap();
            created.push(CreatedProperty {
                id,
                unit: unit.clone(),
                holder: holder.to_string(),
            });
            created.len()
        };

        if let Some((after, token)) = &self.cancel_after {
            if count >= *after {
                token.cancel();
            }
        }
        Ok(id)
    }

    async fn attach_enrichment(&self, property_id: Uuid, details: &NsnDetails) -> Result<(), StoreError> {
        self.enrichments
            .lock()
            .unwrap()
            .insert(property_id, details.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    failing: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let ledger = Self::default();
        ledger.failing.store(true, Ordering::SeqCst);
        ledger
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn property_entries(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| matches!(e, LedgerEntry::PropertyCreated { .. }))
            .count()
    }

    pub fn summaries(&self) -> Vec<LedgerEntry> {
        self.entries()
            .into_iter()
            .filter(|e| matches!(e, LedgerEntry::ImportSummary { .. }))
            .collect()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn append(&self, entry: &LedgerEntry) -> Result<LedgerReceipt, LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("ledger offline".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(LedgerReceipt {
            entry_id: Uuid::new_v4(),
            recorded_at: chrono::Utc::now(),
        })
    }
}

/// Catalog answering from a fixed table; unknown NSNs are NotFound
#[derive(Default)]
pub struct StaticCatalog {
    records: HashMap<String, NsnLookup>,
    calls: AtomicUsize,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, details: NsnDetails) -> Self {
        self.records
            .insert(details.nsn.clone(), NsnLookup::Found(details));
        self
    }

    pub fn with_transient(mut self, nsn: &str) -> Self {
        self.records.insert(
            nsn.to_string(),
            NsnLookup::TransientError("503 Service Unavailable".to_string()),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NsnCatalog for StaticCatalog {
    async fn lookup(&self, nsn: &str) -> NsnLookup {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.get(nsn).cloned().unwrap_or(NsnLookup::NotFound)
    }
}

pub fn nsn_details(nsn: &str, nomenclature: &str) -> NsnDetails {
    NsnDetails {
        nsn: nsn.to_string(),
        lin: Some("C74940".to_string()),
        nomenclature: nomenclature.to_string(),
        fsc: Some(nsn[..4].to_string()),
        niin: None,
        unit_price: Some(1532.0),
        manufacturer: None,
        part_number: None,
    }
}
