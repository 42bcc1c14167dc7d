//! SQLite persistence for interventions, step records and photos.
//!
//! Each engine call opens its own [`Database`] on a blocking thread. Every
//! mutation runs inside one transaction so a rejected call leaves no trace.

use std::path::Path;

use rusqlite::{types::Type, Connection};

use crate::error::{DatabaseResultExt, Result};

pub mod intervention_queries;
pub mod photo_queries;
pub mod schema;
pub mod step_queries;

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}

/// Parses a TEXT column into any `FromStr` value, mapping failures to a
/// conversion error on that column.
pub(crate) fn parse_column<T>(row: &rusqlite::Row, index: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(index)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("Invalid value '{raw}': {e}").into(),
        )
    })
}

/// Same as [`parse_column`] for nullable columns.
pub(crate) fn parse_optional_column<T>(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = row.get(index)?;
    raw.map(|value| {
        value.parse::<T>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                Type::Text,
                format!("Invalid value '{value}': {e}").into(),
            )
        })
    })
    .transpose()
}

/// Decodes a JSON TEXT column.
pub(crate) fn json_column<T>(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let raw: Option<String> = row.get(index)?;
    raw.map(|value| {
        serde_json::from_str(&value)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
    })
    .transpose()
}
