//! Tableau Server / Tableau Cloud download client.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use tracing::{info, warn};

use crate::fetch::DownloadedArchive;
use crate::traits::{ArchiveFetcher, FetchError};

/// REST API version used when a web UI URL has to be rewritten.
pub const DEFAULT_API_VERSION: &str = "3.17";

const TABLEAU_AUTH_HEADER: &str = "X-Tableau-Auth";
const ARCHIVE_MEDIA_TYPE: &str = "application/octet-stream";

/// Configuration for [`TableauServerFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// REST API version inserted into rewritten URLs (default: 3.17)
    pub api_version: String,

    /// Whole-request timeout; `None` leaves the client default
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: None,
        }
    }
}

impl FetchConfig {
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Downloads packaged data sources over the Tableau REST API.
pub struct TableauServerFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl TableauServerFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config))
    }

    pub fn with_client(client: reqwest::Client, config: FetchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ArchiveFetcher for TableauServerFetcher {
    fn name(&self) -> &str {
        "tableau-server"
    }

    async fn fetch(
        &self,
        locator: &str,
        token: Option<&str>,
    ) -> Result<DownloadedArchive, FetchError> {
        let api_url = resolve_api_url(locator, &self.config.api_version)?;
        if api_url != locator {
            info!(url = %api_url, "Constructed API URL");
        }

        let mut request = self.client.get(&api_url).header(ACCEPT, ARCHIVE_MEDIA_TYPE);
        match token {
            Some(token) => {
                request = request.bearer_auth(token).header(TABLEAU_AUTH_HEADER, token);
            }
            None => warn!("No access token provided; the download may fail if authentication is required"),
        }

        info!(url = %api_url, "Downloading");
        let mut response = request.send().await?;
        check_status(&api_url, response.status())?;

        let mut file = tempfile::Builder::new()
            .prefix("tableau-sql-")
            .suffix(".tdsx")
            .tempfile()?;

        let mut size_bytes = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            size_bytes += chunk.len() as u64;
        }
        file.flush()?;

        let temp = file.into_temp_path();
        info!(path = %temp.display(), size_bytes, "Downloaded to temporary file");

        Ok(DownloadedArchive::new(temp, api_url, size_bytes))
    }
}

fn datasource_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/site/([^/]+)/datasources/([A-Za-z0-9-]+)")
            .expect("datasource pattern is a valid regex")
    })
}

/// Maps a locator to the REST endpoint serving the archive content.
///
/// URLs already pointing at `/api/` pass through unchanged. Web UI URLs of the
/// form `https://host/#/site/<site>/datasources/<id>` are rewritten to
/// `https://host/api/<version>/sites/<site>/datasources/<id>/content`.
pub fn resolve_api_url(locator: &str, api_version: &str) -> Result<String, FetchError> {
    if locator.contains("/api/") {
        return Ok(locator.to_string());
    }

    let invalid = || FetchError::InvalidLocator(locator.to_string());

    let captures = datasource_pattern().captures(locator).ok_or_else(invalid)?;
    let url = Url::parse(locator).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?;

    let base = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };

    Ok(format!(
        "{base}/api/{api_version}/sites/{}/datasources/{}/content",
        &captures[1], &captures[2]
    ))
}

/// Classifies a non-success response status.
pub fn check_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized {
            url: url.to_string(),
        }),
        StatusCode::NOT_FOUND => Err(FetchError::NotFound {
            url: url.to_string(),
        }),
        status if !status.is_success() => Err(FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }),
        _ => Ok(()),
    }
}
