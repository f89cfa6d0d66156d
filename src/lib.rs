//! Box Office Explorer - quarterly box-office rankings, enriched and filterable
//!
//! This library scrapes the quarterly listings of the box-office site, looks
//! up metadata for every ranked title and keeps both in a SQLite database.
//! All network access goes through a persistent response cache.

mod cache;
mod config;
pub mod display;
mod fetcher;
pub mod genre;
mod metadata;
mod ranking;
mod store;
mod text;

pub use cache::{CacheError, CacheLoad, CacheStore};
pub use config::{Config, ConfigError};
pub use fetcher::{FetchError, HttpFetcher, HttpTransport, Transport};
pub use genre::{GENRES, GenreSelection};
pub use metadata::{LookupOutcome, MetadataClient, MetadataError, MetadataRecord};
pub use ranking::{Quarter, RankingParseError, RankingRecord, UnknownQuarter, listing_url, parse_rankings};
pub use store::{Store, StoreError, Table, TopRanking, UpsertOutcome};
pub use text::{parse_currency, title_case};

use thiserror::Error;
use tracing::info;

/// Number of rows shown in the top ranking chart
pub const TOP_RANKING_LIMIT: usize = 10;

/// Progress event emitted while building the database
///
/// These events allow library users to track progress and provide feedback
/// during ingestion.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Fetching the listing page of a quarter
    FetchingQuarter { quarter: Quarter, url: String },

    /// A listing page was parsed
    QuarterParsed {
        quarter: Quarter,
        records: Vec<RankingRecord>,
    },

    /// The ranking table was replaced
    RankingsSaved { count: usize },

    /// Looking up metadata for one title
    LookingUp {
        index: usize,
        total: usize,
        title: String,
    },

    /// The lookup service has no data for a title
    MetadataNotFound { title: String },

    /// The metadata table was written
    MetadataSaved { count: usize },
}

/// Top-level error type for Box Office Explorer operations
#[derive(Debug, Error)]
pub enum BoxOfficeError {
    /// Error fetching a listing page
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Error parsing a listing page
    #[error("Failed to parse listing for {quarter}: {source}")]
    RankingParse {
        quarter: Quarter,
        source: RankingParseError,
    },

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    Metadata(#[from] MetadataError),

    /// Error during database operations
    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    /// Error building the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A remote lookup was requested without an access key
    #[error("No metadata API key configured (use --api-key or OMDB_API_KEY)")]
    MissingApiKey,
}

/// A session over one cache, one database and the two remote services
///
/// The session owns the [`CacheStore`] and hands it by reference to the
/// fetcher and the metadata client; there is no global state.
pub struct BoxOffice<T = HttpTransport> {
    cache: CacheStore,
    fetcher: HttpFetcher<T>,
    metadata: Option<MetadataClient>,
    store: Store,
    listing_base_url: String,
}

impl BoxOffice<HttpTransport> {
    /// Opens the cache and database named by `config`
    pub fn open(config: &Config) -> Result<Self, BoxOfficeError> {
        let store = Store::open(&config.database_path)?;
        Ok(Self::with_parts(
            config,
            CacheStore::open(&config.cache_path),
            HttpTransport::new(),
            store,
        ))
    }
}

impl<T: Transport> BoxOffice<T> {
    /// Assembles a session from already opened parts
    pub fn with_parts(config: &Config, cache: CacheStore, transport: T, store: Store) -> Self {
        let metadata = config
            .api_key
            .as_ref()
            .map(|key| MetadataClient::new(config.metadata_base_url.clone(), key.clone()));

        Self {
            cache,
            fetcher: HttpFetcher::new(transport, config.request_delay),
            metadata,
            store,
            listing_base_url: config.listing_base_url.clone(),
        }
    }

    /// Fetches and parses every quarter, then replaces the ranking table
    ///
    /// Nothing is written unless all quarters were parsed successfully.
    pub fn ingest_rankings<F>(&mut self, mut progress: F) -> Result<usize, BoxOfficeError>
    where
        F: FnMut(ProgressEvent),
    {
        let mut rows = Vec::new();

        for quarter in Quarter::ALL {
            let url = listing_url(&self.listing_base_url, quarter);
            progress(ProgressEvent::FetchingQuarter {
                quarter,
                url: url.clone(),
            });

            let html = self.fetcher.fetch(&url, &mut self.cache)?;
            let records = parse_rankings(&html, quarter, &self.listing_base_url)
                .map_err(|e| BoxOfficeError::RankingParse { quarter, source: e })?;

            progress(ProgressEvent::QuarterParsed {
                quarter,
                records: records.clone(),
            });
            rows.extend(records);
        }

        self.store.replace_table(&rows)?;
        info!(rows = rows.len(), "ranking table replaced");
        progress(ProgressEvent::RankingsSaved { count: rows.len() });

        Ok(rows.len())
    }

    /// Looks up every distinct ranked title and replaces the metadata table
    ///
    /// Titles the service does not know are reported and skipped.
    pub fn seed_metadata<F>(&mut self, mut progress: F) -> Result<usize, BoxOfficeError>
    where
        F: FnMut(ProgressEvent),
    {
        let titles = self.store.distinct_ranking_titles()?;
        let mut records = Vec::with_capacity(titles.len());

        for (index, title) in titles.iter().enumerate() {
            progress(ProgressEvent::LookingUp {
                index,
                total: titles.len(),
                title: title.clone(),
            });

            match self.lookup(title)? {
                LookupOutcome::Found(record) => records.push(record),
                LookupOutcome::NotFound { title } => {
                    progress(ProgressEvent::MetadataNotFound { title });
                }
            }
        }

        self.store.replace_table(&records)?;
        info!(rows = records.len(), "metadata table seeded");
        progress(ProgressEvent::MetadataSaved {
            count: records.len(),
        });

        Ok(records.len())
    }

    /// Runs the full pipeline: rankings first, then metadata
    pub fn build<F>(&mut self, mut progress: F) -> Result<(), BoxOfficeError>
    where
        F: FnMut(ProgressEvent),
    {
        self.ingest_rankings(&mut progress)?;
        self.seed_metadata(&mut progress)?;
        Ok(())
    }

    /// Whether the ranking table already holds data
    pub fn is_populated(&self) -> Result<bool, BoxOfficeError> {
        Ok(self.store.row_count::<RankingRecord>()? > 0)
    }

    /// Resolves a title against the lookup service (through the cache)
    pub fn lookup(&mut self, title: &str) -> Result<LookupOutcome, BoxOfficeError> {
        let client = self.metadata.as_ref().ok_or(BoxOfficeError::MissingApiKey)?;
        Ok(client.lookup(title, &self.fetcher, &mut self.cache)?)
    }

    /// Returns metadata for a title, asking the lookup service only when the
    /// database has none
    ///
    /// A remotely found record is written with upsert-by-title semantics.
    pub fn movie_info(&mut self, title: &str) -> Result<LookupOutcome, BoxOfficeError> {
        let title = title_case(title);

        if let Some(record) = self.store.metadata_by_title(&title)? {
            return Ok(LookupOutcome::Found(record));
        }

        let outcome = self.lookup(&title)?;
        if let LookupOutcome::Found(record) = &outcome {
            self.store.upsert_metadata_by_title(record)?;
        }
        Ok(outcome)
    }

    /// Highest grossing ranking rows
    pub fn top_rankings(&self, limit: usize) -> Result<Vec<TopRanking>, BoxOfficeError> {
        Ok(self.store.top_rankings(limit)?)
    }

    /// Every ranking row
    pub fn all_rankings(&self) -> Result<Vec<RankingRecord>, BoxOfficeError> {
        Ok(self.store.all_rankings()?)
    }

    /// Every metadata row
    pub fn all_metadata(&self) -> Result<Vec<MetadataRecord>, BoxOfficeError> {
        Ok(self.store.all_metadata()?)
    }

    /// Metadata rows matching any of the selected genres
    pub fn metadata_by_genres(
        &self,
        selection: &GenreSelection,
    ) -> Result<Vec<MetadataRecord>, BoxOfficeError> {
        let records = self.store.all_metadata()?;
        let mask = genre::select(&records, selection);

        Ok(records
            .into_iter()
            .zip(mask)
            .filter_map(|(record, selected)| selected.then_some(record))
            .collect())
    }

    /// Detail-page link for a year and quarter
    pub fn ranking_link(
        &self,
        year: i32,
        quarter: Quarter,
    ) -> Result<Option<String>, BoxOfficeError> {
        Ok(self.store.ranking_link(year, quarter)?)
    }
}
