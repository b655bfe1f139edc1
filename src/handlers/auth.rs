use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    cache::keys,
    error::AppError,
    middleware::auth::{removal_cookie, token_cookie},
    models::user::{AuthResponse, CreateUser, LoginPayload, Role},
    password, store, AppState,
};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let new_user = payload.validate()?;

    if store::users::find_by_username(&state.db, &new_user.username)
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate("User already exists".to_string()));
    }

    let password_hash = password::hash(&new_user.password)?;
    let user = store::users::insert(
        &state.db,
        &new_user.username,
        new_user.email.as_deref(),
        &password_hash,
        Role::User,
    )
    .await?;

    state.cache.invalidate(keys::USERS_PATTERN).await;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created", "user": user })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let (Some(username), Some(password)) = (
        payload.username.filter(|u| !u.is_empty()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    let user = store::users::find_by_username(&state.db, &username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify(&password, &user.password_hash)? {
        tracing::debug!(username = %username, "login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let access_token = state.tokens.issue(user.id, &user.username, user.role)?;
    let cookie = token_cookie(
        &access_token,
        state.tokens.lifetime(),
        state.config.production,
    );
    tracing::info!(username = %user.username, role = user.role.as_str(), "login successful");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(AuthResponse { access_token, user }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, removal_cookie(state.config.production))],
        Json(json!({ "message": "Logged out" })),
    )
}
