use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;
pub mod sqlite_store;
pub mod store;

#[derive(Clone)]
pub struct DBService {
    pub pool: SqlitePool,
}

impl DBService {
    /// Open (creating if missing) the SQLite database at `database_url` and
    /// apply pending migrations.
    pub async fn new(database_url: &str) -> Result<DBService, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(database_url, "database ready");
        Ok(DBService { pool })
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn new_in_memory() -> Result<DBService, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }
}
