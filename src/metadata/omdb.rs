/// OMDb metadata client implementation.
use super::omdb_types::OmdbTitleResponse;
use super::{LookupOutcome, MetadataError, MetadataRecord};
use crate::cache::CacheStore;
use crate::fetcher::{HttpFetcher, Transport};
use crate::text::title_case;
use tracing::warn;

/// Client for the OMDb title lookup endpoint.
///
/// Requests go through an [`HttpFetcher`] and the shared [`CacheStore`], so a
/// title is only ever fetched once per cache.
pub struct MetadataClient {
    base_url: String,
    api_key: String,
}

impl MetadataClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds the lookup URL for a title.
    ///
    /// Whitespace runs become `+`; everything else that is not URL-safe is
    /// percent-encoded. The URL doubles as the cache key.
    pub fn query_url(&self, title: &str) -> String {
        let query = title
            .split_whitespace()
            .map(|word| urlencoding::encode(word).into_owned())
            .collect::<Vec<_>>()
            .join("+");

        format!(
            "{}/?t={}&apikey={}",
            self.base_url.trim_end_matches('/'),
            query,
            urlencoding::encode(&self.api_key)
        )
    }

    /// Resolves `title` to a metadata record.
    ///
    /// # Returns
    ///
    /// `LookupOutcome::NotFound` when the service reports no match. Transport
    /// failures and unparsable responses are errors.
    pub fn lookup<T: Transport>(
        &self,
        title: &str,
        fetcher: &HttpFetcher<T>,
        cache: &mut CacheStore,
    ) -> Result<LookupOutcome, MetadataError> {
        let url = self.query_url(title);
        let body = fetcher.fetch(&url, cache)?;
        Self::parse_response(title, &body)
    }

    /// Converts a raw response body into a lookup outcome.
    fn parse_response(title: &str, body: &str) -> Result<LookupOutcome, MetadataError> {
        let response: OmdbTitleResponse =
            serde_json::from_str(body).map_err(|e| MetadataError::Parse {
                title: title.to_string(),
                message: e.to_string(),
            })?;

        if !response.is_success() {
            warn!(
                title,
                reason = response.error.as_deref().unwrap_or("unknown"),
                "no metadata available"
            );
            return Ok(LookupOutcome::NotFound {
                title: title.to_string(),
            });
        }

        let required = |value: Option<String>, field: &'static str| {
            value.ok_or_else(|| MetadataError::InvalidData {
                title: title.to_string(),
                field,
            })
        };

        Ok(LookupOutcome::Found(MetadataRecord {
            title: title_case(&required(response.title, "Title")?),
            released: required(response.released, "Released")?,
            runtime: required(response.runtime, "Runtime")?,
            genre: required(response.genre, "Genre")?,
            director: required(response.director, "Director")?,
            actors: required(response.actors, "Actors")?,
            language: required(response.language, "Language")?,
            country: required(response.country, "Country")?,
            awards: required(response.awards, "Awards")?,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use std::time::Duration;

    /// Builds a successful OMDb envelope for a title and genre list
    pub(crate) fn omdb_body(title: &str, genre: &str) -> String {
        serde_json::json!({
            "Title": title,
            "Year": "2019",
            "Rated": "PG-13",
            "Released": "26 Apr 2019",
            "Runtime": "181 min",
            "Genre": genre,
            "Director": "Anthony Russo, Joe Russo",
            "Actors": "Robert Downey Jr., Chris Evans",
            "Language": "English, Japanese",
            "Country": "United States",
            "Awards": "Nominated for 1 Oscar",
            "Response": "True"
        })
        .to_string()
    }

    struct FixedTransport(String);

    impl Transport for FixedTransport {
        fn get(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_query_url_replaces_spaces() {
        let client = MetadataClient::new("http://www.omdbapi.com", "4cf891f");
        assert_eq!(
            client.query_url("Avengers: Endgame"),
            "http://www.omdbapi.com/?t=Avengers%3A+Endgame&apikey=4cf891f"
        );
        assert_eq!(
            client.query_url("The  Lion King"),
            "http://www.omdbapi.com/?t=The+Lion+King&apikey=4cf891f"
        );
    }

    #[test]
    fn test_found_record_keeps_field_order() {
        let outcome = MetadataClient::parse_response(
            "avengers: endgame",
            &omdb_body("avengers: endgame", "Action, Adventure, Drama"),
        )
        .unwrap();

        let record = outcome.found().unwrap();
        assert_eq!(record.title, "Avengers: Endgame");
        assert_eq!(record.genre, "Action, Adventure, Drama");
        assert_eq!(
            record.display_pairs().map(|(label, _)| label),
            [
                "Title", "Released", "Runtime", "Genre", "Director", "Actors", "Language",
                "Country", "Awards"
            ]
        );
        assert_eq!(record.display_pairs()[2], ("Runtime", "181 min"));
    }

    #[test]
    fn test_response_false_is_not_found() {
        let outcome =
            MetadataClient::parse_response("Nope", r#"{"Response":"False"}"#).unwrap();
        assert_eq!(
            outcome,
            LookupOutcome::NotFound {
                title: "Nope".to_string()
            }
        );

        let outcome = MetadataClient::parse_response(
            "Nope",
            r#"{"Response":"False","Error":"Movie not found!"}"#,
        )
        .unwrap();
        assert!(outcome.found().is_none());
    }

    #[test]
    fn test_non_json_body_is_parse_error() {
        let err =
            MetadataClient::parse_response("Joker", "<html>Service Unavailable</html>").unwrap_err();
        assert!(matches!(err, MetadataError::Parse { ref title, .. } if title == "Joker"));
    }

    #[test]
    fn test_missing_field_is_invalid_data() {
        let err = MetadataClient::parse_response(
            "Joker",
            r#"{"Response":"True","Title":"Joker"}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::InvalidData {
                field: "Released",
                ..
            }
        ));
    }

    #[test]
    fn test_lookup_goes_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheStore::open(dir.path().join("cache.json"));
        let fetcher = HttpFetcher::new(
            FixedTransport(omdb_body("Joker", "Crime, Drama, Thriller")),
            Duration::ZERO,
        );
        let client = MetadataClient::new("http://www.omdbapi.com", "key");

        let record = client
            .lookup("Joker", &fetcher, &mut cache)
            .unwrap()
            .found()
            .unwrap();

        assert_eq!(record.director, "Anthony Russo, Joe Russo");
        assert!(cache.get(&client.query_url("Joker")).is_some());
    }
}
