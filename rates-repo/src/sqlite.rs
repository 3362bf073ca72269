//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use rates_types::{
    ApiKeyRecord, HistoricalRateRecord, RateMap, RateRecord, RateRepository, RepoError,
    SupportedCurrency, SyncBatch,
};

use crate::StoreOptions;
use crate::types::{
    DATE_FORMAT, DbApiKey, DbSupportedCurrency, SqliteHistoricalRow, SqliteRateRow,
};

const UPSERT_RATE: &str = r#"INSERT INTO exchange_rates (base_currency, currency, rate, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT (base_currency, currency)
    DO UPDATE SET rate = excluded.rate, updated_at = excluded.updated_at"#;

const INSERT_HISTORICAL: &str = r#"INSERT INTO historical_rates (base_currency, currency, rate, date)
    VALUES (?, ?, ?, ?)
    ON CONFLICT (base_currency, currency, date) DO NOTHING"#;

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

/// Runs every statement of a migration file.
async fn execute_migration(pool: &SqlitePool, sql: &str, name: &str) -> anyhow::Result<()> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_rate_tables.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_reference_tables.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with default pool limits and automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        Self::connect(database_url, &StoreOptions::default()).await
    }

    /// Creates a new SQLite repository with automatic migration.
    pub async fn connect(database_url: &str, options: &StoreOptions) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(options.statement_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    /// Current rate for a pair.
    pub async fn get_rate(
        &self,
        base_currency: &str,
        currency: &str,
    ) -> Result<Option<RateRecord>, RepoError> {
        let row: Option<SqliteRateRow> = sqlx::query_as(
            r#"SELECT base_currency, currency, rate, updated_at FROM exchange_rates
               WHERE base_currency = ? AND currency = ?"#,
        )
        .bind(base_currency)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(SqliteRateRow::into_domain).transpose()
    }

    /// Current rates for a base, ordered by currency.
    pub async fn list_rates(&self, base_currency: &str) -> Result<Vec<RateRecord>, RepoError> {
        let rows: Vec<SqliteRateRow> = sqlx::query_as(
            r#"SELECT base_currency, currency, rate, updated_at FROM exchange_rates
               WHERE base_currency = ? ORDER BY currency"#,
        )
        .bind(base_currency)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(SqliteRateRow::into_domain).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateRepository for SqliteRepo {
    async fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<usize, RepoError> {
        let date = batch.date.format(DATE_FORMAT).to_string();
        let now = Utc::now().to_rfc3339();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        for obs in &batch.observations {
            let rate = obs.rate.to_string();

            sqlx::query(INSERT_HISTORICAL)
                .bind(&obs.base_currency)
                .bind(&obs.currency)
                .bind(&rate)
                .bind(&date)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

            sqlx::query(UPSERT_RATE)
                .bind(&obs.base_currency)
                .bind(&obs.currency)
                .bind(&rate)
                .bind(&now)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(batch.len())
    }

    async fn upsert_rates(
        &self,
        base_currency: &str,
        rates: &RateMap,
    ) -> Result<usize, RepoError> {
        let now = Utc::now().to_rfc3339();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        for (currency, rate) in rates {
            sqlx::query(UPSERT_RATE)
                .bind(base_currency)
                .bind(currency)
                .bind(rate.to_string())
                .bind(&now)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(rates.len())
    }

    async fn historical_rates(
        &self,
        base_currency: &str,
        limit: i64,
    ) -> Result<Vec<HistoricalRateRecord>, RepoError> {
        let rows: Vec<SqliteHistoricalRow> = sqlx::query_as(
            r#"SELECT base_currency, currency, rate, date FROM historical_rates
               WHERE base_currency = ?
               ORDER BY date DESC, currency ASC
               LIMIT ?"#,
        )
        .bind(base_currency)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter()
            .map(SqliteHistoricalRow::into_domain)
            .collect()
    }

    async fn supported_currencies(&self) -> Result<Vec<SupportedCurrency>, RepoError> {
        let rows: Vec<DbSupportedCurrency> =
            sqlx::query_as(r#"SELECT code, name FROM supported_currencies ORDER BY code"#)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(SupportedCurrency::from).collect())
    }

    async fn find_api_key(&self, key_value: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        let row: Option<DbApiKey> =
            sqlx::query_as(r#"SELECT key_value, user_role FROM api_keys WHERE key_value = ?"#)
                .bind(key_value)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiKey::into_domain).transpose()
    }
}
