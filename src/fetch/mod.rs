//! Remote archive fetching.
//!
//! [`TableauServerFetcher`] implements [`ArchiveFetcher`](crate::ArchiveFetcher)
//! over the Tableau REST API and hands back a [`DownloadedArchive`] whose
//! temporary file is removed on drop.

pub mod download;
pub mod server;

pub use download::DownloadedArchive;
pub use server::{
    check_status, resolve_api_url, FetchConfig, TableauServerFetcher, DEFAULT_API_VERSION,
};
