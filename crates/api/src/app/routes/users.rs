//! Registration, login and profile management.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use storefront_auth::{
    hash_password, verify_password, PasswordError, Permission, RegisterUser, UpdateProfile, UserAccount,
    UserCommand,
};
use storefront_core::UserId;

use crate::app::dto::{self, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const USER_NOT_FOUND: &str = "User not found";

pub fn public_router() -> Router {
    Router::new()
        .route("/", post(register))
        .route("/login", post(login))
}

pub fn protected_router() -> Router {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;

    if services.user_repo.by_email(&body.email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }
    let password_hash = hash_blocking(body.password).await?;

    let user_id = UserId::new();
    let cmd = UserCommand::Register(RegisterUser {
        user_id,
        is_admin: services.is_admin_email(&body.email),
        name: body.name,
        email: body.email,
        password_hash,
        occurred_at: Utc::now(),
    });
    let account = services
        .users
        .dispatch(*user_id.as_uuid(), cmd, || UserAccount::empty(user_id))
        .await?;

    tracing::info!(user_id = %user_id, admin = account.is_admin(), "user registered");
    let token = services.issue_token(&account)?;
    Ok((StatusCode::CREATED, Json(UserResponse::new(&account, Some(token)))).into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(body) = body?;

    let account = services
        .user_repo
        .by_email(&body.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let hash = account.password_hash().to_string();
    let verified = tokio::task::spawn_blocking(move || verify_password(&body.password, &hash))
        .await
        .map_err(ApiError::internal)?;
    if !verified {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = services.issue_token(&account)?;
    Ok(Json(UserResponse::new(&account, Some(token))))
}

pub async fn get_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<UserResponse>, ApiError> {
    authz::require(&principal, Permission::PROFILE_MANAGE)?;
    let account = services
        .user_repo
        .get(principal.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok(Json(UserResponse::new(&account, None)))
}

/// Update name, email and/or password; responds with a fresh token.
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    authz::require(&principal, Permission::PROFILE_MANAGE)?;
    let Json(body) = body?;
    let body = body.normalized();
    let user_id = principal.user_id();

    if let Some(email) = &body.email {
        let taken = services.user_repo.by_email(email).await?;
        if taken.is_some_and(|other| other.user_id() != user_id) {
            return Err(ApiError::bad_request("Email already in use"));
        }
    }
    let password_hash = match body.password {
        Some(password) => Some(hash_blocking(password).await?),
        None => None,
    };

    let cmd = UserCommand::UpdateProfile(UpdateProfile {
        user_id,
        name: body.name,
        email: body.email,
        password_hash,
        occurred_at: Utc::now(),
    });
    let account = services
        .users
        .dispatch(*user_id.as_uuid(), cmd, || UserAccount::empty(user_id))
        .await
        .map_err(|e| ApiError::from_dispatch(e, USER_NOT_FOUND))?;

    let token = services.issue_token(&account)?;
    Ok(Json(UserResponse::new(&account, Some(token))))
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(|e| match e {
            PasswordError::TooShort(_) => ApiError::bad_request(e.to_string()),
            PasswordError::Hash => ApiError::internal(e),
        })
}
