use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::NewUser,
    },
    error::{AppError, AppResult},
    extractors::ValidatedJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = payload.email;

    // Cheap early exit before hashing; create_user re-checks under the lock.
    if state.storage.get_user_by_email(&email).await.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(payload.password).await?;
    let user = state
        .storage
        .create_user(NewUser {
            name: payload.name,
            email,
            password_hash,
        })
        .await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user: PublicUser::from(user),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = payload.email;
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let Some(user) = state.storage.get_user_by_email(&email).await else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(payload.password, user.password_hash.clone()).await? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        user: PublicUser::from(user),
        token,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state.storage.get_user(user_id).await.ok_or_else(|| {
        warn!(user_id = %user_id, "token for unknown user");
        AppError::NotFound("User not found".into())
    })?;
    Ok(Json(PublicUser::from(user)))
}
