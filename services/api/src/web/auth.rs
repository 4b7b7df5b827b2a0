//! services/api/src/web/auth.rs
//!
//! Registration and login endpoints. There are no server-side sessions:
//! the client keeps the returned user id and sends it with its requests.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use dream_journal_core::{
    domain::{NewUser, User},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct AuthResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<User> for AuthResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /users/register - Create a new user account
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request, or username/email already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username, email and password are required".to_string(),
        ));
    }

    // 1. Reject taken usernames and emails with a specific message
    let taken = |e: PortError| {
        error!("Failed to look up user: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Error creating user".to_string())
    };
    if state.db.find_user_by_username(&username).await.map_err(taken)?.is_some() {
        return Err((StatusCode::BAD_REQUEST, "Username already taken".to_string()));
    }
    if state.db.find_user_by_email(&email).await.map_err(taken)?.is_some() {
        return Err((StatusCode::BAD_REQUEST, "Email already registered".to_string()));
    }

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let hashed_password = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error creating user".to_string())
        })?
        .to_string();

    // 3. Create user in database
    let user = state
        .db
        .create_user(NewUser {
            username,
            email,
            hashed_password,
            name: req.name,
            avatar_url: req.avatar_url,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration.
            PortError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error creating user".to_string())
            }
        })?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse::from(user))))
}

/// POST /users/login - Check credentials and return the user
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username and password are required".to_string(),
        ));
    }

    // 1. Get user by username
    let creds = state
        .db
        .find_user_by_username(req.username.trim())
        .await
        .map_err(|e| {
            error!("Failed to get user: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error during login".to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid username or password".to_string()))?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Error during login".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid username or password".to_string()));
    }

    Ok(Json(AuthResponse::from(creds.user)))
}
