//! API key domain types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role attached to an API key.
///
/// Roles are compared by strict equality: an `Admin` key is not accepted
/// where a `User` key is required, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Returns the role name as stored in the `api_keys` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// An API key row. Provisioned outside this service; only ever read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key_value: String,
    pub user_role: Role,
}

impl ApiKeyRecord {
    pub fn new(key_value: impl Into<String>, user_role: Role) -> Self {
        Self {
            key_value: key_value.into(),
            user_role,
        }
    }
}
