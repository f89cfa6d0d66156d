/// Movie metadata retrieval.
///
/// This module provides the metadata record stored for every ranked title and
/// the client resolving titles against the OMDb lookup service.
mod omdb;
mod omdb_types;

pub use omdb::MetadataClient;

#[cfg(test)]
pub(crate) use omdb::tests::omdb_body;

use crate::fetcher::FetchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
///
/// A title the service does not know is not an error; see
/// [`LookupOutcome::NotFound`].
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Fetching the lookup URL failed
    #[error("Metadata request failed: {0}")]
    Fetch(#[from] FetchError),

    /// The response body is not the expected JSON envelope
    #[error("Failed to parse metadata response for {title:?}: {message}")]
    Parse { title: String, message: String },

    /// The service reported success but omitted a required field
    #[error("Metadata response for {title:?} is missing field {field}")]
    InvalidData { title: String, field: &'static str },
}

/// Enrichment data for a single movie title.
///
/// Field order matches the `Movie_Info` table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Title as reported by the service, title-cased
    pub title: String,
    /// Release date, e.g. "26 Apr 2019"
    pub released: String,
    /// Runtime, e.g. "181 min"
    pub runtime: String,
    /// Comma-separated genre names
    pub genre: String,
    pub director: String,
    pub actors: String,
    pub language: String,
    pub country: String,
    pub awards: String,
}

impl MetadataRecord {
    /// Labelled fields in display order
    pub fn display_pairs(&self) -> [(&'static str, &str); 9] {
        [
            ("Title", &self.title),
            ("Released", &self.released),
            ("Runtime", &self.runtime),
            ("Genre", &self.genre),
            ("Director", &self.director),
            ("Actors", &self.actors),
            ("Language", &self.language),
            ("Country", &self.country),
            ("Awards", &self.awards),
        ]
    }
}

/// Result of resolving a title against the lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The service knows the title
    Found(MetadataRecord),
    /// The service reported that it has no data for the title
    NotFound { title: String },
}

impl LookupOutcome {
    /// Returns the record if the lookup succeeded
    pub fn found(self) -> Option<MetadataRecord> {
        match self {
            LookupOutcome::Found(record) => Some(record),
            LookupOutcome::NotFound { .. } => None,
        }
    }
}
