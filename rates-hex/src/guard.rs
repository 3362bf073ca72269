//! Access guard for mutating operations.

use std::sync::Arc;

use rates_types::{ApiKeyRecord, AppError, RateRepository, Role};

/// Checks a caller-supplied API key, and optionally its role, against the store.
///
/// Decisions are never cached; every call is a store lookup.
pub struct AccessGuard<R: RateRepository> {
    repo: Arc<R>,
}

impl<R: RateRepository> Clone for AccessGuard<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: RateRepository> AccessGuard<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Resolves `credential` to its key record.
    ///
    /// Role comparison is strict: an `Admin` key does not satisfy a `User`
    /// requirement.
    pub async fn authorize(
        &self,
        credential: Option<&str>,
        required: Option<Role>,
    ) -> Result<ApiKeyRecord, AppError> {
        let key = match credential {
            Some(key) if !key.is_empty() => key,
            _ => return Err(AppError::MissingCredential),
        };

        let record = self
            .repo
            .find_api_key(key)
            .await?
            .ok_or(AppError::InvalidCredential)?;

        match required {
            Some(role) if record.user_role != role => {
                tracing::debug!(required = %role, actual = %record.user_role, "Role mismatch");
                Err(AppError::RoleMismatch {
                    required: role,
                    actual: record.user_role,
                })
            }
            _ => Ok(record),
        }
    }
}
