use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot read inventory `{location}`: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid inventory URL `{location}`: {message}")]
    Url { location: String, message: String },
    #[error("cannot fetch inventory `{location}`: {message}")]
    Http { location: String, message: String },
}

impl FetchError {
    pub fn http(location: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Http {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn url(location: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Url {
            location: location.into(),
            message: message.to_string(),
        }
    }
}

/// Source of raw inventory bytes: a local path or a URL.
#[async_trait]
pub trait InventoryFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError>;
}
