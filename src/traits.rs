use crate::fetch::DownloadedArchive;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Could not parse Tableau URL '{0}'. Expected https://<server>/#/site/<site>/datasources/<id> or a REST API URL")]
    InvalidLocator(String),
    #[error("Authentication failed for {url}. Provide a valid access token with --token")]
    Unauthorized { url: String },
    #[error("Data source not found at {url}. Check the URL and your permissions")]
    NotFound { url: String },
    #[error("Server returned HTTP {status} for {url}")]
    Http { url: String, status: u16 },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to store downloaded archive: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Returns a short identifier for this fetcher (e.g., "tableau-server").
    fn name(&self) -> &str;

    /// Downloads the archive behind `locator` into a scoped temporary file.
    async fn fetch(
        &self,
        locator: &str,
        token: Option<&str>,
    ) -> Result<DownloadedArchive, FetchError>;
}
