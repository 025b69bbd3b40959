//! NSN catalog HTTP client
//!
//! `GET {endpoint}/nsn/{nsn}` returning an `NsnDetails` JSON body. Requests
//! are rate limited and answers (found or not found) are cached, oldest
//! evicted first once the cache is full. Transient failures are not cached.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::extraction::nsn;
use crate::models::{NsnDetails, NsnLookup};
use crate::types::NsnCatalog;

const USER_AGENT: &str = concat!("handreceipt-import/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "X-API-Key";
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Error)]
pub enum NsnClientError {
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Enforces a minimum interval between outbound requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Catalog answers keyed by normalized NSN; `None` records a not-found
struct LookupCache {
    entries: HashMap<String, Option<NsnDetails>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl LookupCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, nsn: &str) -> Option<&Option<NsnDetails>> {
        self.entries.get(nsn)
    }

    fn insert(&mut self, nsn: String, details: Option<NsnDetails>) {
        if self.entries.contains_key(&nsn) {
            self.entries.insert(nsn, details);
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(nsn = %oldest, "Evicted NSN catalog cache entry");
        }
        self.order.push_back(nsn.clone());
        self.entries.insert(nsn, details);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct NsnCatalogClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter>,
    cache: Mutex<LookupCache>,
}

impl NsnCatalogClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        rate_limit_ms: u64,
    ) -> Result<Self, NsnClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| NsnClientError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit_ms)),
            cache: Mutex::new(LookupCache::new(DEFAULT_CACHE_CAPACITY)),
        })
    }

    pub fn with_cache_capacity(self, capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LookupCache::new(capacity)),
            ..self
        }
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn fetch(&self, nsn: &str) -> NsnLookup {
        self.rate_limiter.wait().await;

        let url = format!("{}/nsn/{}", self.endpoint, nsn);
        tracing::debug!(nsn = %nsn, url = %url, "Querying NSN catalog");

        let mut request = self.http_client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return NsnLookup::TransientError(format!("network error: {}", e)),
        };

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return NsnLookup::NotFound;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return NsnLookup::TransientError(format!("catalog returned {}: {}", status, body));
        }

        match response.json::<NsnDetails>().await {
            Ok(details) => {
                tracing::info!(
                    nsn = %nsn,
                    nomenclature = %details.nomenclature,
                    "Retrieved NSN catalog record"
                );
                NsnLookup::Found(details)
            }
            Err(e) => NsnLookup::TransientError(format!("unreadable catalog response: {}", e)),
        }
    }
}

#[async_trait::async_trait]
impl NsnCatalog for NsnCatalogClient {
    async fn lookup(&self, raw_nsn: &str) -> NsnLookup {
        let Some(nsn) = nsn::normalize(raw_nsn) else {
            return NsnLookup::NotFound;
        };

        if let Some(cached) = self.cache.lock().await.get(&nsn) {
            tracing::debug!(nsn = %nsn, "NSN catalog cache hit");
            return match cached {
                Some(details) => NsnLookup::Found(details.clone()),
                None => NsnLookup::NotFound,
            };
        }

        let result = self.fetch(&nsn).await;
        match &result {
            NsnLookup::Found(details) => {
                self.cache.lock().await.insert(nsn, Some(details.clone()));
            }
            NsnLookup::NotFound => {
                self.cache.lock().await.insert(nsn, None);
            }
            NsnLookup::TransientError(_) => {}
        }
        result
    }
}
