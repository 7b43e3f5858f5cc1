//! Inventory loader for local files and HTTP(S) URLs.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::application::inventory::{FetchError, InventoryFetcher};

const URL_MARKER: &str = "://";

/// Reads `location` from disk, or over HTTP when it looks like a URL.
#[derive(Debug, Clone)]
pub struct LocationFetcher {
    client: Client,
}

impl LocationFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| FetchError::http("<client>", err))?;
        Ok(Self { client })
    }

    pub fn user_agent() -> &'static str {
        concat!("docgraph/", env!("CARGO_PKG_VERSION"))
    }

    async fn fetch_url(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(location).map_err(|err| FetchError::url(location, err))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::http(location, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http(location, format!("status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::http(location, err))?;
        Ok(body.to_vec())
    }
}

pub fn is_url(location: &str) -> bool {
    location.contains(URL_MARKER)
}

#[async_trait]
impl InventoryFetcher for LocationFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let started = Instant::now();
        let remote = is_url(location);

        let raw = if remote {
            self.fetch_url(location).await?
        } else {
            tokio::fs::read(location)
                .await
                .map_err(|source| FetchError::Read {
                    location: location.to_string(),
                    source,
                })?
        };

        debug!(
            target = "infra::fetch",
            op = "inventory::fetch",
            location,
            remote,
            bytes = raw.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inventory fetched"
        );
        Ok(raw)
    }
}
