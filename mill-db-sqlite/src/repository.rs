use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mill_core::{ExtractionRepository, NewExtraction, RepositoryError, SavedExtraction, UserId};
use sqlx::{Row, sqlite::SqlitePool};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal};

/// Secondary index serving the owner + date ordered query.
pub const HISTORY_INDEX: &str = "idx_extractions_user_date";

const SELECT_COLUMNS: &str = "SELECT id, user_id, flour, bran, yield_percentage, created_at
     FROM extractions";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn get_extraction(
        &self,
        id: i64,
    ) -> Result<SavedExtraction, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        row_to_extraction(&row)
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp_to_text(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
        })
        .map_err(|e| RepositoryError::Database(format!("Failed to parse datetime '{}': {}", s, e)))
}

fn row_to_extraction(row: &sqlx::sqlite::SqliteRow) -> Result<SavedExtraction, RepositoryError> {
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?;

    Ok(SavedExtraction {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        user_id: UserId::new(user_id),
        flour: get_decimal(row, "flour")?,
        bran: get_decimal(row, "bran")?,
        yield_percentage: get_decimal(row, "yield_percentage")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// SQLite reports an absent `INDEXED BY` target as "no such index".
fn map_ordered_query_error(e: sqlx::Error) -> RepositoryError {
    let message = e.to_string();
    if message.contains("no such index") {
        RepositoryError::MissingIndex(message)
    } else {
        RepositoryError::Database(message)
    }
}

#[async_trait]
impl ExtractionRepository for SqliteRepository {
    async fn append(
        &self,
        extraction: NewExtraction,
    ) -> Result<SavedExtraction, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO extractions (user_id, flour, bran, yield_percentage, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(extraction.user_id.as_str())
        .bind(decimal_to_text(extraction.flour))
        .bind(decimal_to_text(extraction.bran))
        .bind(decimal_to_text(extraction.yield_percentage))
        .bind(timestamp_to_text(now))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        debug!(id, user_id = %extraction.user_id, "inserted extraction");
        self.get_extraction(id).await
    }

    async fn list_by_owner_ordered(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SavedExtraction>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT id, user_id, flour, bran, yield_percentage, created_at
             FROM extractions INDEXED BY {HISTORY_INDEX}
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_ordered_query_error)?;

        rows.iter().map(row_to_extraction).collect()
    }

    async fn list_by_owner(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SavedExtraction>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE user_id = ?"))
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_extraction).collect()
    }
}
