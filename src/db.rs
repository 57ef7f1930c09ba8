use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

/// Opens (creating if needed) the database and brings the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("bad DATABASE_URL `{database_url}`"))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(10));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("failed to open database")?;

    sqlx::migrate!().run(&db_pool).await.context("failed to run migrations")?;
    info!(database_url, "database ready");

    Ok(db_pool)
}

pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// A private in-memory database. One connection, kept alive for the pool's lifetime.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&db_pool).await.unwrap();
    db_pool
}
