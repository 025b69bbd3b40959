//! Configuration resolution for handreceipt-import
//!
//! NSN catalog settings resolve with ENV → TOML priority. A missing endpoint
//! is not an error: enrichment is best effort and the pipeline runs without it.

use handreceipt_common::config::{NsnCatalogConfig, TomlConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::{NsnCatalogClient, NsnClientError, NsnEnricher};

pub const NSN_API_KEY_ENV: &str = "HANDRECEIPT_NSN_API_KEY";
pub const NSN_ENDPOINT_ENV: &str = "HANDRECEIPT_NSN_ENDPOINT";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the NSN catalog API key
///
/// **Priority:** ENV → TOML
pub fn resolve_nsn_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(NSN_API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .nsn_catalog
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("NSN API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("NSN API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("NSN API key loaded from TOML config");
        return Some(key);
    }
    None
}

/// Resolve the NSN catalog base URL
///
/// **Priority:** ENV → TOML
pub fn resolve_nsn_endpoint(toml_config: &TomlConfig) -> Option<String> {
    std::env::var(NSN_ENDPOINT_ENV)
        .ok()
        .or_else(|| toml_config.nsn_catalog.endpoint.clone())
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

/// Build the enricher from config, or `None` when enrichment is disabled or
/// no endpoint is configured
pub fn build_nsn_enricher(
    toml_config: &TomlConfig,
) -> Result<Option<Arc<NsnEnricher>>, NsnClientError> {
    let settings: &NsnCatalogConfig = &toml_config.nsn_catalog;
    if !settings.enabled {
        info!("NSN enrichment disabled by configuration");
        return Ok(None);
    }

    let Some(endpoint) = resolve_nsn_endpoint(toml_config) else {
        warn!(
            "NSN catalog endpoint not configured (set {} or nsn_catalog.endpoint); enrichment disabled",
            NSN_ENDPOINT_ENV
        );
        return Ok(None);
    };

    let timeout = Duration::from_secs(settings.timeout_secs.max(1));
    let client = NsnCatalogClient::new(
        endpoint.clone(),
        resolve_nsn_api_key(toml_config),
        timeout,
        settings.rate_limit_ms,
    )?
    .with_cache_capacity(settings.cache_capacity);
    info!(endpoint = %endpoint, "NSN catalog client configured");

    let enricher = NsnEnricher::new(Arc::new(client))
        .with_retry_attempts(settings.retry_attempts)
        .with_timeout(timeout);
    Ok(Some(Arc::new(enricher)))
}
