//! Axum route handlers for the Auth API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::normalize_email;
use crate::auth::password::{hash_password, verify_password, UNKNOWN_ACCOUNT_HASH};
use crate::auth::store::User;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
}

impl CredentialsRequest {
    /// Normalized email plus password, or a validation error when either is blank.
    fn into_parts(self) -> Result<(String, String), AppError> {
        let email = normalize_email(&self.email);
        if email.is_empty() || self.password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        Ok((email, self.password))
    }
}

/// POST /api/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let (email, password) = request.into_parts()?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    // Re-checked atomically: two concurrent signups for one email must not both succeed.
    let user = User::new(email, password_hash);
    let user_id = user.id;
    if !state.users.insert_if_absent(user).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    info!("User {user_id} signed up");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".to_string(),
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (email, password) = request.into_parts()?;

    let user = state.users.find_by_email(&email).await?;

    // Unknown emails still pay for a full verification.
    let stored = user
        .as_ref()
        .map_or_else(|| UNKNOWN_ACCOUNT_HASH.to_string(), |u| u.password_hash.clone());
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    let user = match user {
        Some(user) if matches => user,
        _ => return Err(AppError::InvalidCredentials),
    };

    let token = state.sessions.issue(&user).await;
    info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        token,
        email: user.email,
    }))
}
