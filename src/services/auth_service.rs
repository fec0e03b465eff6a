//! Account registration, login, and bearer-token verification.
//!
//! Tokens are HMAC-SHA256-signed claims: `base64url(claims).base64url(mac)`.
//! Passwords are stored as salted SHA-256 digests, `{salt}${base64(digest)}`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::user::{Identity, Role, User};

type HmacSha256 = Hmac<Sha256>;

/// Bearer tokens stay valid for this long.
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("token encoding failed: {0}")]
    Token(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    exp: i64,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// AuthService owns everything credential-shaped: creating accounts,
/// checking passwords, and minting/verifying the bearer tokens that carry
/// the acting principal into the catalog service.
#[derive(Clone)]
pub struct AuthService {
    /// Shared SQLite connection pool used for account lookups.
    pub db: Arc<SqlitePool>,

    secret: String,
}

impl AuthService {
    pub fn new(db: Arc<SqlitePool>, secret: impl Into<String>) -> Self {
        Self {
            db,
            secret: secret.into(),
        }
    }

    /// Create a regular account. Email must be unused.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AuthResult<User> {
        let name = name.trim();
        let email = email.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("name is required".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidInput("a valid email is required".into()));
        }
        if password.len() < 6 {
            return Err(AuthError::InvalidInput(
                "password must be at least 6 characters".into(),
            ));
        }

        let user = self.insert_user(name, &email, password, Role::User).await?;
        info!(id = %user.id, email = %user.email, "registered account");
        Ok(user)
    }

    /// Check credentials and return the account.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = email.trim().to_ascii_lowercase();
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(&email)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(&user.password_hash, password) {
            debug!(email = %email, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Mint a bearer token for an account.
    pub fn token_for(&self, user: &User) -> AuthResult<String> {
        self.mint_token(user.id, user.role, TOKEN_TTL_HOURS)
    }

    /// Verify a bearer token and resolve the acting principal.
    ///
    /// The token signature and expiry are checked first, then the account
    /// row is confirmed to still exist; a token for a removed account is
    /// treated as invalid.
    pub async fn authenticate(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.verify_token(token)?;
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(claims.sub)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(AuthError::InvalidToken)?;

        Ok(Identity {
            id: user.id,
            role: user.role,
        })
    }

    /// Idempotent admin bootstrap, invoked once by process startup.
    ///
    /// Creates the privileged account only when no account with that email
    /// exists yet; a concurrent seed losing the insert race is treated as
    /// already-done.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> AuthResult<()> {
        let email = email.trim().to_ascii_lowercase();
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&*self.db)
            .await?;
        if existing.is_some() {
            info!(email = %email, "admin account already present, skipping bootstrap");
            return Ok(());
        }

        match self.insert_user(name, &email, password, Role::Admin).await {
            Ok(user) => {
                info!(id = %user.id, email = %user.email, "created admin account");
                Ok(())
            }
            Err(AuthError::EmailTaken) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> AuthResult<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(Self::hash_password(password))
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(AuthError::EmailTaken),
            Err(err) => Err(AuthError::Db(err)),
        }
    }

    fn hash_password(password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        format!("{salt}${}", Self::digest(&salt, password))
    }

    fn verify_password(stored: &str, password: &str) -> bool {
        match stored.split_once('$') {
            Some((salt, digest)) => Self::digest(salt, password) == digest,
            None => false,
        }
    }

    fn digest(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    fn mint_token(&self, id: Uuid, role: Role, ttl_hours: i64) -> AuthResult<String> {
        let claims = Claims {
            sub: id,
            role,
            exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&claims).map_err(|err| AuthError::Token(err.to_string()))?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);
        Ok(format!("{payload}.{signature}"))
    }

    fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|err| AuthError::Token(err.to_string()))?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(AuthError::InvalidToken)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> AuthResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|err| AuthError::Token(err.to_string()))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Return true if the SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
