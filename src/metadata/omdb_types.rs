/// OMDb API response types for deserialization.
///
/// These structures mirror the JSON envelope returned by the `?t=` endpoint.
use serde::Deserialize;

/// The envelope returned for a title query.
///
/// On failure only `Response` ("False") and `Error` are present, so every
/// data field is optional here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct OmdbTitleResponse {
    /// "True" or "False"
    pub response: String,
    /// Failure reason, e.g. "Movie not found!"
    pub error: Option<String>,
    pub title: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
}

impl OmdbTitleResponse {
    /// Whether the service reported a match
    pub fn is_success(&self) -> bool {
        !self.response.eq_ignore_ascii_case("false")
    }
}
