// Rust guideline compliant 2026-10-17

//! HTTP adapter for the `RegionLookup` port.
//!
//! Fetches `{id, name}` arrays from the public Indonesian region API
//! (`provinces.json`, `regencies/{province}.json`, ...). Caching and fallback
//! live in `predictor::RegionNameResolver`; this adapter only fetches.

use std::time::Duration;

use domain::{LookupError, Region, RegionLookup};

/// `RegionLookup` adapter backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRegionLookup {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRegionLookup {
    /// Create a client for the API rooted at `base_url`; every request is
    /// bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl RegionLookup for HttpRegionLookup {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<Region>, LookupError> {
        let url = self.url(endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Unavailable { reason: e.to_string() })?;
        if !response.status().is_success() {
            return Err(LookupError::Unavailable {
                reason: format!("{url}: HTTP {}", response.status()),
            });
        }
        let regions: Vec<Region> = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed { reason: e.to_string() })?;
        tracing::debug!("region_api.fetch: url={url} entries={}", regions.len());
        Ok(regions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
