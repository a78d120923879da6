use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

pub mod contact;
pub mod invoice;

/// Opens the sqlite pool shared by all storages.
///
/// In-memory databases live and die with their connection, so they get a
/// single connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to sqlite at {}", database_url);
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// A write refused by a foreign key or unique constraint.
///
/// Storages return it inside `anyhow::Error` so callers can tell a lost race
/// apart from a broken database.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConstraintViolation(pub String);

pub(crate) fn constraint_violation(error: sqlx::Error, context: impl FnOnce() -> String) -> anyhow::Error {
    match &error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_unique_violation() => {
            ConstraintViolation(context()).into()
        }
        _ => error.into(),
    }
}

// fixed width so text ordering matches time ordering
pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
