//! SQLite implementation of the record store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{FromRow, SqlitePool};

use super::{InsertOutcome, RecordSnapshot, RecordStore, StoreBackend, StoreError};
use crate::fingerprint::Fingerprint;
use crate::record::Record;

/// SQLite-backed record store.
///
/// WAL journal with `synchronous = FULL`: a committed insert survives a
/// crash or power loss.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct RecordRow {
    identity: String,
    content_locator: String,
    fingerprint: String,
    title: String,
    origin: String,
    author: String,
    external_link: String,
    posted_at: Option<i64>,
    observed_at: i64,
}

impl TryFrom<RecordRow> for Record {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, StoreError> {
        let fingerprint = Fingerprint::parse(row.fingerprint).map_err(|e| {
            StoreError::Serialization(format!("record {}: {e}", row.identity))
        })?;
        let observed_at = from_millis(row.observed_at).ok_or_else(|| {
            StoreError::Serialization(format!(
                "record {}: observed_at out of range: {}",
                row.identity, row.observed_at
            ))
        })?;

        Ok(Self {
            identity: row.identity,
            content_locator: row.content_locator,
            fingerprint,
            title: row.title,
            origin: row.origin,
            author: row.author,
            external_link: row.external_link,
            posted_at: row.posted_at.and_then(from_millis),
            observed_at,
        })
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

const SELECT_COLUMNS: &str = "SELECT identity, content_locator, fingerprint, title, origin, \
     author, external_link, posted_at, observed_at FROM records";

impl SqliteRecordStore {
    /// Connect to a `sqlite:` URL or a plain file path, creating the file
    /// if needed.
    pub async fn open(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!("Connected to SQLite database");
        Ok(Self { pool })
    }

    /// Create from an existing pool (for testing)
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    #[tracing::instrument(level = "debug", skip_all, fields(identity = %record.identity))]
    async fn insert(&self, record: Record) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO records
                (identity, content_locator, fingerprint, title, origin,
                 author, external_link, posted_at, observed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (identity) DO NOTHING
            "#,
        )
        .bind(&record.identity)
        .bind(&record.content_locator)
        .bind(record.fingerprint.as_str())
        .bind(&record.title)
        .bind(&record.origin)
        .bind(&record.author)
        .bind(&record.external_link)
        .bind(record.posted_at.map(|t| t.timestamp_millis()))
        .bind(record.observed_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Identity already stored");
            return Ok(InsertOutcome::AlreadyPresent);
        }

        tracing::debug!("Stored record");
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, identity: &str) -> Result<Option<Record>, StoreError> {
        let row: Option<RecordRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE identity = ?"))
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Record::try_from).transpose()
    }

    async fn all(&self) -> Result<RecordSnapshot, StoreError> {
        let rows: Vec<RecordRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY observed_at, identity"))
                .fetch_all(&self.pool)
                .await?;

        let records = rows
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RecordSnapshot::new(records))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Check database connection health
    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Close the pool, flushing WAL state.
    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_empty_fingerprint_is_rejected() {
        let row = RecordRow {
            identity: "p1".into(),
            content_locator: "loc".into(),
            fingerprint: String::new(),
            title: String::new(),
            origin: String::new(),
            author: String::new(),
            external_link: String::new(),
            posted_at: None,
            observed_at: 0,
        };
        assert!(matches!(
            Record::try_from(row),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_row_round_trips_millis() {
        let row = RecordRow {
            identity: "p1".into(),
            content_locator: "loc".into(),
            fingerprint: "1010".into(),
            title: "t".into(),
            origin: "r/pics".into(),
            author: "a".into(),
            external_link: "l".into(),
            posted_at: Some(1_600_000_000_000),
            observed_at: 1_700_000_000_123,
        };
        let record = Record::try_from(row).unwrap();
        assert_eq!(record.observed_at.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(record.posted_at.unwrap().timestamp(), 1_600_000_000);
    }
}
