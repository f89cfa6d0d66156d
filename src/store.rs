//! SQLite persistence for rankings and movie metadata.
//!
//! Two tables are kept: `Movie_Rank`, which is replaced wholesale on every
//! ingestion run, and `Movie_Info`, which is seeded in bulk and then grows
//! by appends. Neither table declares a uniqueness constraint.

use std::path::Path;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use thiserror::Error;
use tracing::debug;

use crate::metadata::MetadataRecord;
use crate::ranking::{Quarter, RankingRecord};

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to create the directory holding the database file
    #[error("Failed to create database directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Any SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A record type that maps onto one database table.
///
/// The table name and columns are fixed per type, so no table or column
/// name ever comes from user input.
pub trait Table: Sized {
    /// Table name
    const NAME: &'static str;
    /// Column names with their SQLite types, in storage order
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// Values to bind for an insert, in column order
    fn bind(&self) -> Vec<&dyn ToSql>;

    /// Decodes a row selected with all columns in column order
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl Table for RankingRecord {
    const NAME: &'static str = "Movie_Rank";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("year", "INTEGER"),
        ("quarter", "TEXT"),
        ("name", "TEXT"),
        ("cumulative_gross", "INTEGER"),
        ("per_release_average_gross", "INTEGER"),
        ("rank_of_year_link", "TEXT"),
    ];

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.year as &dyn ToSql,
            &self.quarter,
            &self.title,
            &self.cumulative_gross,
            &self.per_release_average_gross,
            &self.detail_link,
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RankingRecord {
            year: row.get(0)?,
            quarter: row.get(1)?,
            title: row.get(2)?,
            cumulative_gross: row.get(3)?,
            per_release_average_gross: row.get(4)?,
            detail_link: row.get(5)?,
        })
    }
}

impl Table for MetadataRecord {
    const NAME: &'static str = "Movie_Info";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("name", "TEXT"),
        ("released", "TEXT"),
        ("runtime", "TEXT"),
        ("genre", "TEXT"),
        ("director", "TEXT"),
        ("actors", "TEXT"),
        ("language", "TEXT"),
        ("country", "TEXT"),
        ("awards", "TEXT"),
    ];

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.title as &dyn ToSql,
            &self.released,
            &self.runtime,
            &self.genre,
            &self.director,
            &self.actors,
            &self.language,
            &self.country,
            &self.awards,
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MetadataRecord {
            title: row.get(0)?,
            released: row.get(1)?,
            runtime: row.get(2)?,
            genre: row.get(3)?,
            director: row.get(4)?,
            actors: row.get(5)?,
            language: row.get(6)?,
            country: row.get(7)?,
            awards: row.get(8)?,
        })
    }
}

impl ToSql for Quarter {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for Quarter {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Projection returned by [`Store::top_rankings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopRanking {
    pub title: String,
    pub year: i32,
    pub cumulative_gross: u64,
}

/// Whether [`Store::upsert_metadata_by_title`] wrote a new row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row had the title; the record was appended
    Inserted,
    /// This many rows with the title were overwritten
    Updated(usize),
}

/// SQLite-backed store for the ranking and metadata tables.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens the database at `path`, creating the file and tables if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(&format!(
            "{}; {};",
            create_table_sql::<RankingRecord>(true),
            create_table_sql::<MetadataRecord>(true)
        ))?;
        Ok(())
    }

    /// Drops and recreates the table for `R`, then inserts exactly `rows`.
    ///
    /// Runs in a single transaction, so readers never see a half-written
    /// table.
    pub fn replace_table<R: Table>(&mut self, rows: &[R]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; {};",
            R::NAME,
            create_table_sql::<R>(false)
        ))?;
        insert_rows(&tx, rows)?;
        tx.commit()?;

        debug!(table = R::NAME, rows = rows.len(), "replaced table");
        Ok(())
    }

    /// Inserts `rows` without looking for existing rows with the same key.
    pub fn append_rows<R: Table>(&mut self, rows: &[R]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        insert_rows(&tx, rows)?;
        tx.commit()?;

        debug!(table = R::NAME, rows = rows.len(), "appended rows");
        Ok(())
    }

    /// Writes `record` unless rows with its title exist, in which case those
    /// rows are overwritten with the new values.
    pub fn upsert_metadata_by_title(
        &mut self,
        record: &MetadataRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE Movie_Info SET released = ?2, runtime = ?3, genre = ?4, director = ?5,
                 actors = ?6, language = ?7, country = ?8, awards = ?9
             WHERE name = ?1",
            params![
                record.title,
                record.released,
                record.runtime,
                record.genre,
                record.director,
                record.actors,
                record.language,
                record.country,
                record.awards,
            ],
        )?;

        let outcome = if updated == 0 {
            insert_rows(&tx, std::slice::from_ref(record))?;
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated(updated)
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Top `limit` ranking rows by cumulative gross, highest first.
    pub fn top_rankings(&self, limit: usize) -> Result<Vec<TopRanking>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, year, cumulative_gross FROM Movie_Rank
             ORDER BY cumulative_gross DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TopRanking {
                title: row.get(0)?,
                year: row.get(1)?,
                cumulative_gross: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every ranking row in storage order.
    pub fn all_rankings(&self) -> Result<Vec<RankingRecord>, StoreError> {
        self.select_all()
    }

    /// Every metadata row in storage order.
    pub fn all_metadata(&self) -> Result<Vec<MetadataRecord>, StoreError> {
        self.select_all()
    }

    /// First metadata row whose title matches exactly.
    pub fn metadata_by_title(&self, title: &str) -> Result<Option<MetadataRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM Movie_Info WHERE name = ?1 ORDER BY rowid LIMIT 1",
            column_list::<MetadataRecord>()
        );

        Ok(self
            .conn
            .query_row(&sql, params![title], MetadataRecord::from_row)
            .optional()?)
    }

    /// Detail-page link of the ranking row for `year` and `quarter`.
    pub fn ranking_link(&self, year: i32, quarter: Quarter) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT rank_of_year_link FROM Movie_Rank
                 WHERE year = ?1 AND quarter = ?2 ORDER BY rowid LIMIT 1",
                params![year, quarter],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Distinct ranking titles in order of first appearance.
    pub fn distinct_ranking_titles(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM Movie_Rank GROUP BY name ORDER BY MIN(rowid)",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Number of rows in the table for `R`.
    pub fn row_count<R: Table>(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", R::NAME),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn select_all<R: Table>(&self) -> Result<Vec<R>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            column_list::<R>(),
            R::NAME
        ))?;
        let rows = stmt.query_map([], R::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn column_list<R: Table>() -> String {
    R::COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn create_table_sql<R: Table>(if_not_exists: bool) -> String {
    let columns = R::COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        R::NAME,
        columns
    )
}

fn insert_rows<R: Table>(conn: &Connection, rows: &[R]) -> Result<(), StoreError> {
    let placeholders = (1..=R::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::NAME,
        column_list::<R>(),
        placeholders
    ))?;

    for row in rows {
        stmt.execute(&*row.bind())?;
    }
    Ok(())
}
