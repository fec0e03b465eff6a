//! Represents an account that can own catalogued image records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Authorization role attached to an account.
///
/// `Admin` may delete any record and run the bulk clear; `User` may only
/// delete records they uploaded themselves.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// A registered account.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    /// Unique identifier (UUID for internal DB use).
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Login email, unique across accounts.
    pub email: String,

    /// Salted digest of the password. Never serialized out.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Authorization role.
    pub role: Role,

    /// When this account was created.
    pub created_at: DateTime<Utc>,
}

/// The acting principal attached to an authenticated request.
///
/// Produced by the auth layer after token verification; the catalog service
/// trusts it as already verified.
#[derive(Clone, Copy, Debug)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public projection of an account, safe to embed in responses.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
