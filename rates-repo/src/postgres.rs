//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;

use rates_types::{
    ApiKeyRecord, HistoricalRateRecord, RateMap, RateRepository, RepoError, SupportedCurrency,
    SyncBatch,
};

use crate::StoreOptions;
use crate::types::{DbApiKey, DbSupportedCurrency, PgHistoricalRow};

const UPSERT_RATE: &str = r#"INSERT INTO exchange_rates (base_currency, currency, rate, updated_at)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (base_currency, currency)
    DO UPDATE SET rate = EXCLUDED.rate, updated_at = EXCLUDED.updated_at"#;

const INSERT_HISTORICAL: &str = r#"INSERT INTO historical_rates (base_currency, currency, rate, date)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (base_currency, currency, date) DO NOTHING"#;

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
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

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_rate_tables_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_reference_tables_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with default pool limits and automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        Self::connect(database_url, &StoreOptions::default()).await
    }

    /// Creates a new PostgreSQL repository with automatic migration.
    ///
    /// Every pooled connection carries a server-side `statement_timeout`.
    pub async fn connect(database_url: &str, options: &StoreOptions) -> anyhow::Result<Self> {
        let statement_timeout_ms = options.statement_timeout.as_millis().to_string();
        let connect_options = PgConnectOptions::from_str(database_url)?
            .options([("statement_timeout", statement_timeout_ms.as_str())]);

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateRepository for PostgresRepo {
    async fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<usize, RepoError> {
        let now = Utc::now();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        for obs in &batch.observations {
            sqlx::query(INSERT_HISTORICAL)
                .bind(&obs.base_currency)
                .bind(&obs.currency)
                .bind(obs.rate)
                .bind(batch.date)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

            sqlx::query(UPSERT_RATE)
                .bind(&obs.base_currency)
                .bind(&obs.currency)
                .bind(obs.rate)
                .bind(now)
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
        let now = Utc::now();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        for (currency, rate) in rates {
            sqlx::query(UPSERT_RATE)
                .bind(base_currency)
                .bind(currency)
                .bind(*rate)
                .bind(now)
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
        let rows: Vec<PgHistoricalRow> = sqlx::query_as(
            r#"SELECT base_currency, currency, rate, date FROM historical_rates
               WHERE base_currency = $1
               ORDER BY date DESC, currency ASC
               LIMIT $2"#,
        )
        .bind(base_currency)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(HistoricalRateRecord::from).collect())
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
            sqlx::query_as(r#"SELECT key_value, user_role FROM api_keys WHERE key_value = $1"#)
                .bind(key_value)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiKey::into_domain).transpose()
    }
}
