//! Runtime configuration
//!
//! Paths default to the platform's standard cache and data directories:
//! - Linux: ~/.cache/boxofficeexplorer/ and ~/.local/share/boxofficeexplorer/
//! - macOS: ~/Library/Caches/... and ~/Library/Application Support/...
//! - Windows: %LOCALAPPDATA%\... and %APPDATA%\...

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Root of the box-office listing site
pub const DEFAULT_LISTING_BASE_URL: &str = "https://www.boxofficemojo.com";

/// Root of the metadata lookup service
pub const DEFAULT_METADATA_BASE_URL: &str = "http://www.omdbapi.com";

/// Pause before every request that is not answered from the cache
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// File name of the response cache
pub const CACHE_FILE_NAME: &str = "box_scrape.json";

/// File name of the SQLite database
pub const DATABASE_FILE_NAME: &str = "movies_data.sqlite";

/// Errors that can occur while building the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the standard directories for this platform
    #[error("Failed to determine cache/data directory location")]
    ProjectDirectoryNotFound,
}

/// Settings for a [`BoxOffice`](crate::BoxOffice) session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON file caching every fetched response
    pub cache_path: PathBuf,
    /// SQLite database holding the ranking and metadata tables
    pub database_path: PathBuf,
    /// Root of the listing site; relative detail links resolve against it
    pub listing_base_url: String,
    /// Root of the metadata lookup service
    pub metadata_base_url: String,
    /// Access key for the metadata service, required for remote lookups
    pub api_key: Option<String>,
    /// Pause before every uncached request
    pub request_delay: Duration,
}

impl Config {
    /// Configuration storing the cache and database in the standard
    /// directories for this platform
    pub fn from_project_dirs() -> Result<Self, ConfigError> {
        let proj_dirs = directories::ProjectDirs::from("com", "boxofficeexplorer", "boxofficeexplorer")
            .ok_or(ConfigError::ProjectDirectoryNotFound)?;

        Ok(Self::in_directories(
            proj_dirs.cache_dir().to_path_buf(),
            proj_dirs.data_dir().to_path_buf(),
        ))
    }

    /// Configuration with the cache file in `cache_dir` and the database in
    /// `data_dir`, everything else at its default
    pub fn in_directories(cache_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            cache_path: cache_dir.join(CACHE_FILE_NAME),
            database_path: data_dir.join(DATABASE_FILE_NAME),
            listing_base_url: DEFAULT_LISTING_BASE_URL.to_string(),
            metadata_base_url: DEFAULT_METADATA_BASE_URL.to_string(),
            api_key: None,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}
