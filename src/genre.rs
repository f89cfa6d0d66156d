//! Genre filter over metadata records

use crate::metadata::MetadataRecord;

/// Genre names offered for filtering
pub const GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Biography",
    "Comedy",
    "Crime",
    "Drama",
    "Family",
    "Fantasy",
    "Film-Noir",
    "History",
    "Horror",
    "Music",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Sport",
    "Thriller",
    "War",
    "Western",
];

/// A set of requested genre names
///
/// An empty selection matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreSelection {
    genres: Vec<String>,
}

impl GenreSelection {
    /// Selection matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether no genre was requested
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    /// Requested genre names
    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    /// Whether a record with the given genre field is selected
    ///
    /// Matching is a case-sensitive substring test, so "Music" also matches
    /// "Musical".
    pub fn matches(&self, genre_field: &str) -> bool {
        self.is_empty() || self.genres.iter().any(|g| genre_field.contains(g.as_str()))
    }
}

impl<S: Into<String>> FromIterator<S> for GenreSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut genres: Vec<String> = Vec::new();
        for genre in iter {
            let genre = genre.into();
            if !genre.is_empty() && !genres.contains(&genre) {
                genres.push(genre);
            }
        }
        Self { genres }
    }
}

/// Returns a mask with one entry per record, `true` where the record is selected
pub fn select(records: &[MetadataRecord], selection: &GenreSelection) -> Vec<bool> {
    records
        .iter()
        .map(|record| selection.matches(&record.genre))
        .collect()
}

/// Returns the selected records, in their original order
pub fn filter<'a>(
    records: &'a [MetadataRecord],
    selection: &GenreSelection,
) -> Vec<&'a MetadataRecord> {
    records
        .iter()
        .zip(select(records, selection))
        .filter_map(|(record, selected)| selected.then_some(record))
        .collect()
}
