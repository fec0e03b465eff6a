//! Login/registration endpoints and the bearer-token request extractors.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, header, request::Parts},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::user::{Identity, UserSummary},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub token: String,
}

/// POST `/api/auth/register` — create an account and hand back a token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .register(&req.name, &req.email, &req.password)
        .await?;
    let token = state.auth.token_for(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserSummary::from(&user),
            token,
        }),
    ))
}

/// POST `/api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.auth.login(&req.email, &req.password).await?;
    let token = state.auth.token_for(&user)?;
    Ok(Json(AuthResponse {
        user: UserSummary::from(&user),
        token,
    }))
}

/// Verified acting principal, extracted from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the header is missing or the token does not verify.
pub struct AuthUser(pub Identity);

/// Like [`AuthUser`], but an absent header yields `None` instead of a
/// rejection. A present-but-invalid token is still rejected.
pub struct MaybeUser(pub Option<Identity>);

fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(header_value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header_value
        .to_str()
        .map_err(|_| AppError::unauthorized("invalid authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("invalid token format"))?;
    Ok(Some(token.trim().to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts)?.ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
        let identity = state.auth.authenticate(&token).await?;
        Ok(AuthUser(identity))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let identity = state.auth.authenticate(&token).await?;
                Ok(MaybeUser(Some(identity)))
            }
            None => Ok(MaybeUser(None)),
        }
    }
}
