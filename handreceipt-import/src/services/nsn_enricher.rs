//! Best-effort NSN enrichment
//!
//! Wraps an `NsnCatalog` with a per-attempt timeout and bounded retries on
//! transient errors (exponential backoff). Exhausted retries degrade to
//! "no enrichment"; the caller's unit status never depends on the result.

use std::sync::Arc;
use std::time::Duration;

use crate::extraction::nsn;
use crate::models::{EnrichmentStatus, NsnDetails, NsnLookup};
use crate::types::NsnCatalog;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    pub status: EnrichmentStatus,
    pub details: Option<NsnDetails>,
}

impl EnrichmentOutcome {
    fn without_details(status: EnrichmentStatus) -> Self {
        Self {
            status,
            details: None,
        }
    }
}

pub struct NsnEnricher {
    catalog: Arc<dyn NsnCatalog>,
    retry_attempts: u32,
    attempt_timeout: Duration,
    initial_backoff: Duration,
}

impl NsnEnricher {
    /// Defaults: 2 retries, 5 s per attempt, 200 ms initial backoff
    pub fn new(catalog: Arc<dyn NsnCatalog>) -> Self {
        Self {
            catalog,
            retry_attempts: 2,
            attempt_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(200),
        }
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub async fn enrich(&self, raw_nsn: &str) -> EnrichmentOutcome {
        let Some(nsn) = nsn::normalize(raw_nsn) else {
            return EnrichmentOutcome::without_details(EnrichmentStatus::Skipped);
        };

        let mut backoff = self.initial_backoff;
        for attempt in 0..=self.retry_attempts {
            let lookup = match tokio::time::timeout(self.attempt_timeout, self.catalog.lookup(&nsn))
                .await
            {
                Ok(lookup) => lookup,
                Err(_) => NsnLookup::TransientError(format!(
                    "lookup timed out after {:?}",
                    self.attempt_timeout
                )),
            };

            match lookup {
                NsnLookup::Found(details) => {
                    return EnrichmentOutcome {
                        status: EnrichmentStatus::Enriched,
                        details: Some(details),
                    };
                }
                NsnLookup::NotFound => {
                    tracing::debug!(nsn = %nsn, "NSN not in catalog");
                    return EnrichmentOutcome::without_details(EnrichmentStatus::NotFound);
                }
                NsnLookup::TransientError(message) => {
                    if attempt == self.retry_attempts {
                        tracing::warn!(
                            nsn = %nsn,
                            attempts = attempt + 1,
                            error = %message,
                            "NSN lookup failed; continuing without enrichment"
                        );
                        break;
                    }
                    tracing::debug!(
                        nsn = %nsn,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %message,
                        "NSN lookup failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        EnrichmentOutcome::without_details(EnrichmentStatus::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns each scripted answer once, then repeats the last one
    struct Scripted {
        answers: Vec<NsnLookup>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Scripted {
        fn new(answers: Vec<NsnLookup>) -> Self {
            Self {
                answers,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait::async_trait]
    impl NsnCatalog for Scripted {
        async fn lookup(&self, _nsn: &str) -> NsnLookup {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answers[call.min(self.answers.len() - 1)].clone()
        }
    }

    fn details() -> NsnDetails {
        NsnDetails {
            nsn: "1005-01-231-0973".into(),
            lin: Some("C74940".into()),
            nomenclature: "CARBINE, 5.56 MILLIMETER: M4".into(),
            fsc: Some("1005".into()),
            niin: Some("012310973".into()),
            unit_price: Some(1200.0),
            manufacturer: None,
            part_number: None,
        }
    }

    fn enricher(catalog: Arc<Scripted>) -> NsnEnricher {
        NsnEnricher::new(catalog).with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_found_after_transient_errors() {
        let catalog = Arc::new(Scripted::new(vec![
            NsnLookup::TransientError("503".into()),
            NsnLookup::TransientError("503".into()),
            NsnLookup::Found(details()),
        ]));

        let outcome = enricher(catalog.clone()).enrich("1005012310973").await;
        assert_eq!(outcome.status, EnrichmentStatus::Enriched);
        assert_eq!(outcome.details.unwrap().lin.as_deref(), Some("C74940"));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_is_unavailable() {
        let catalog = Arc::new(Scripted::new(vec![NsnLookup::TransientError("down".into())]));

        let outcome = enricher(catalog.clone()).enrich("1005-01-231-0973").await;
        assert_eq!(outcome.status, EnrichmentStatus::Unavailable);
        // one attempt plus two retries
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let catalog = Arc::new(Scripted::new(vec![NsnLookup::NotFound]));
        let outcome = enricher(catalog.clone()).enrich("1005-01-231-0973").await;
        assert_eq!(outcome.status, EnrichmentStatus::NotFound);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let mut scripted = Scripted::new(vec![NsnLookup::Found(details())]);
        scripted.delay = Duration::from_millis(200);
        let catalog = Arc::new(scripted);

        let outcome = enricher(catalog.clone())
            .with_retry_attempts(1)
            .with_timeout(Duration::from_millis(20))
            .enrich("1005-01-231-0973")
            .await;
        assert_eq!(outcome.status, EnrichmentStatus::Unavailable);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_nsn_skipped() {
        let catalog = Arc::new(Scripted::new(vec![NsnLookup::Found(details())]));
        let outcome = enricher(catalog.clone()).enrich("58-55").await;
        assert_eq!(outcome.status, EnrichmentStatus::Skipped);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }
}
