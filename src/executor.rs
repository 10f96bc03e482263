use crate::extract::{ExtractError, Extraction, SqlExtractor};
use crate::traits::{ArchiveFetcher, FetchError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument};

/// Where the archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    Remote(String),
}

impl Source {
    /// `http://` and `https://` locators are remote; anything else is a path.
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Source::Remote(input.to_string())
        } else {
            Source::Local(PathBuf::from(input))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local(path) => write!(f, "{}", path.display()),
            Source::Remote(url) => f.write_str(url),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug)]
pub struct ExtractionReport {
    pub source: Source,
    pub extraction: Extraction,
}

pub struct ExtractionExecutor<F> {
    fetcher: F,
    extractor: SqlExtractor,
    token: Option<String>,
}

impl<F> ExtractionExecutor<F>
where
    F: ArchiveFetcher,
{
    pub fn new(fetcher: F, extractor: SqlExtractor) -> Self {
        Self {
            fetcher,
            extractor,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Fetches (when remote) and extracts one archive.
    ///
    /// A downloaded archive is held until extraction and persistence finish
    /// and its temporary file is removed on every exit path.
    #[instrument(skip_all, fields(source = %source))]
    pub async fn execute(&self, source: Source) -> Result<ExtractionReport, ExecutorError> {
        let (path, source_name, download) = match &source {
            Source::Local(path) => (path.clone(), path.display().to_string(), None),
            Source::Remote(url) => {
                info!("Fetching with {}", self.fetcher.name());
                let download = self.fetcher.fetch(url, self.token.as_deref()).await?;
                (download.path().to_path_buf(), url.clone(), Some(download))
            }
        };

        info!(path = %path.display(), "Extracting SQL");

        let extractor = self.extractor.clone();
        let extraction = tokio::task::spawn_blocking(move || {
            extractor.extract_file(&path, &source_name)
        })
        .await
        .map_err(|e| ExecutorError::Task(e.to_string()))??;

        drop(download);

        Ok(ExtractionReport { source, extraction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::archive::test_support::zip_bytes;
    use crate::extract::ExtractOptions;
    use crate::fetch::DownloadedArchive;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    const DESCRIPTOR: &str = r#"<datasource>
        <connection class="federated">
          <named-connections>
            <named-connection name="warehouse">
              <connection class="snowflake" one-time-sql="USE ROLE REPORTING;"/>
            </named-connection>
          </named-connections>
          <relation type="text">SELECT * FROM sales</relation>
        </connection>
      </datasource>"#;

    // Mock fetcher serving a canned archive
    struct MockFetcher {
        body: Vec<u8>,
        last_path: Mutex<Option<PathBuf>>,
        last_token: Mutex<Option<String>>,
    }

    impl MockFetcher {
        fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                last_path: Mutex::new(None),
                last_token: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ArchiveFetcher for MockFetcher {
        fn name(&self) -> &str {
            "mock"
        }

        async fn fetch(
            &self,
            locator: &str,
            token: Option<&str>,
        ) -> Result<DownloadedArchive, FetchError> {
            if locator.ends_with("/denied") {
                return Err(FetchError::Unauthorized {
                    url: locator.to_string(),
                });
            }

            let mut file = tempfile::Builder::new().suffix(".tdsx").tempfile()?;
            file.write_all(&self.body)?;
            let temp = file.into_temp_path();

            *self.last_path.lock().unwrap() = Some(temp.to_path_buf());
            *self.last_token.lock().unwrap() = token.map(str::to_string);
            Ok(DownloadedArchive::new(temp, locator, self.body.len() as u64))
        }
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            Source::parse("https://tableau.example.com/#/site/a/datasources/b"),
            Source::Remote("https://tableau.example.com/#/site/a/datasources/b".to_string())
        );
        assert_eq!(
            Source::parse("http://localhost/api/3.17/x"),
            Source::Remote("http://localhost/api/3.17/x".to_string())
        );
        assert_eq!(
            Source::parse("exports/sales.tdsx"),
            Source::Local(PathBuf::from("exports/sales.tdsx"))
        );
    }

    #[tokio::test]
    async fn test_execute_local_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("sales.tdsx");
        std::fs::write(&archive, zip_bytes(&[("Data/Datasources/sales.tds", DESCRIPTOR)])).unwrap();

        let executor = ExtractionExecutor::new(MockFetcher::new(Vec::new()), SqlExtractor::default());
        let report = executor.execute(Source::Local(archive)).await.unwrap();

        let mapping = &report.extraction.mapping;
        let labels: Vec<_> = mapping.labels().collect();
        assert_eq!(labels, vec!["federated", "warehouse_initial_sql"]);
        assert_eq!(mapping.get("federated"), Some("SELECT * FROM sales"));
        assert_eq!(mapping.get("warehouse_initial_sql"), Some("USE ROLE REPORTING;"));
    }

    #[tokio::test]
    async fn test_execute_remote_cleans_up_download() {
        let body = zip_bytes(&[("Data/Datasources/sales.tds", DESCRIPTOR)]);
        let out = tempfile::tempdir().unwrap();

        let extractor = SqlExtractor::new(ExtractOptions::default().with_output_dir(out.path()));
        let executor = ExtractionExecutor::new(MockFetcher::new(body), extractor)
            .with_token(Some("token-123".to_string()));

        let report = executor
            .execute(Source::parse("https://tableau.example.com/api/3.17/sites/s/datasources/d/content"))
            .await
            .unwrap();

        assert_eq!(report.extraction.mapping.len(), 2);
        assert_eq!(report.extraction.written.len(), 2);
        assert!(out.path().join("warehouse_initial_sql.sql").exists());

        let downloaded = executor.fetcher.last_path.lock().unwrap().clone().unwrap();
        assert!(!downloaded.exists());
        assert_eq!(
            executor.fetcher.last_token.lock().unwrap().as_deref(),
            Some("token-123")
        );
    }

    #[tokio::test]
    async fn test_execute_remote_cleans_up_on_extraction_error() {
        let executor =
            ExtractionExecutor::new(MockFetcher::new(b"not a zip".to_vec()), SqlExtractor::default());

        let url = "https://tableau.example.com/api/3.17/sites/s/datasources/d/content";
        let err = executor.execute(Source::parse(url)).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::Extract(ExtractError::NotAnArchive { ref source_name, .. }) if source_name == url
        ));

        let downloaded = executor.fetcher.last_path.lock().unwrap().clone().unwrap();
        assert!(!downloaded.exists());
    }

    #[tokio::test]
    async fn test_execute_reports_fetch_failure() {
        let executor = ExtractionExecutor::new(MockFetcher::new(Vec::new()), SqlExtractor::default());

        let err = executor
            .execute(Source::parse("https://tableau.example.com/denied"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Fetch(FetchError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_execute_missing_local_file() {
        let executor = ExtractionExecutor::new(MockFetcher::new(Vec::new()), SqlExtractor::default());

        let err = executor
            .execute(Source::Local(PathBuf::from("/definitely/not/here.tdsx")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Extract(ExtractError::NotFound { .. })));
    }
}
