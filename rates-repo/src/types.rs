//! Database row types for SQLite and PostgreSQL, and their domain conversions.
//!
//! SQLite has no native decimal or timestamp types, so its rows carry text
//! that is parsed here; Postgres rows decode straight into typed fields.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;

use rates_types::{ApiKeyRecord, HistoricalRateRecord, RepoError, Role, SupportedCurrency};
#[cfg(feature = "sqlite")]
use rates_types::RateRecord;

/// Date format for SQLite `date` columns.
#[cfg(feature = "sqlite")]
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_role(s: &str) -> Result<Role, RepoError> {
    Role::from_str(s).map_err(RepoError::Decode)
}

#[cfg(feature = "sqlite")]
pub fn parse_decimal(s: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(s).map_err(|e| RepoError::Decode(format!("rate {:?}: {}", s, e)))
}

#[cfg(feature = "sqlite")]
pub fn parse_date(s: &str) -> Result<NaiveDate, RepoError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| RepoError::Decode(format!("date {:?}: {}", s, e)))
}

#[cfg(feature = "sqlite")]
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Decode(format!("timestamp {:?}: {}", s, e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend-neutral rows
// ─────────────────────────────────────────────────────────────────────────────

/// API key row from database.
#[derive(FromRow)]
pub struct DbApiKey {
    pub key_value: String,
    pub user_role: String,
}

impl DbApiKey {
    pub fn into_domain(self) -> Result<ApiKeyRecord, RepoError> {
        Ok(ApiKeyRecord {
            user_role: parse_role(&self.user_role)?,
            key_value: self.key_value,
        })
    }
}

/// Supported currency row from database.
#[derive(FromRow)]
pub struct DbSupportedCurrency {
    pub code: String,
    pub name: String,
}

impl From<DbSupportedCurrency> for SupportedCurrency {
    fn from(row: DbSupportedCurrency) -> Self {
        SupportedCurrency {
            code: row.code,
            name: row.name,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite rows (text-encoded rate and time columns)
// ─────────────────────────────────────────────────────────────────────────────

/// Current rate row from SQLite.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct SqliteRateRow {
    pub base_currency: String,
    pub currency: String,
    pub rate: String,
    pub updated_at: String,
}

#[cfg(feature = "sqlite")]
impl SqliteRateRow {
    pub fn into_domain(self) -> Result<RateRecord, RepoError> {
        Ok(RateRecord {
            rate: parse_decimal(&self.rate)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            base_currency: self.base_currency,
            currency: self.currency,
        })
    }
}

/// Historical rate row from SQLite.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct SqliteHistoricalRow {
    pub base_currency: String,
    pub currency: String,
    pub rate: String,
    pub date: String,
}

#[cfg(feature = "sqlite")]
impl SqliteHistoricalRow {
    pub fn into_domain(self) -> Result<HistoricalRateRecord, RepoError> {
        Ok(HistoricalRateRecord {
            rate: parse_decimal(&self.rate)?,
            date: parse_date(&self.date)?,
            base_currency: self.base_currency,
            currency: self.currency,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL rows (native NUMERIC / TIMESTAMPTZ / DATE)
// ─────────────────────────────────────────────────────────────────────────────

/// Historical rate row from PostgreSQL.
#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct PgHistoricalRow {
    pub base_currency: String,
    pub currency: String,
    pub rate: Decimal,
    pub date: NaiveDate,
}

#[cfg(feature = "postgres")]
impl From<PgHistoricalRow> for HistoricalRateRecord {
    fn from(row: PgHistoricalRow) -> Self {
        HistoricalRateRecord {
            base_currency: row.base_currency,
            currency: row.currency,
            rate: row.rate,
            date: row.date,
        }
    }
}
