use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::{json, Value};

use crate::{
    cache::{keys, CacheStats},
    error::AppError,
    middleware::{AdminUser, AuthUser},
    models::user::{UpdateUser, User},
    password,
    store::{self, users::UserChanges},
    AppState,
};

pub async fn list(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state
        .cache
        .read_through(keys::USERS_ALL, || store::users::list(&state.db))
        .await?;
    Ok(Json(users))
}

pub async fn private(AuthUser(identity): AuthUser) -> Json<Value> {
    Json(json!({
        "msg": "Access granted",
        "user": identity.username,
        "role": identity.role,
    }))
}

pub async fn me(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = store::users::find_by_id(&state.db, identity.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn get(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = path?;
    let user = state
        .cache
        .read_through(&keys::user(id), || async {
            store::users::find_by_id(&state.db, id)
                .await?
                .ok_or(AppError::NotFound("User"))
        })
        .await?;
    Ok(Json(user))
}

pub async fn update(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    let mut tx = state.db.begin().await?;

    let user = store::users::find_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    if !identity.may_act_for(user.id) {
        return Err(AppError::forbidden("You do not have permission to modify this user"));
    }

    let changes = payload.validate()?;
    let password_hash = changes.password.as_deref().map(password::hash).transpose()?;
    let updated = store::users::update(
        &mut *tx,
        id,
        UserChanges {
            username: changes.username.as_deref(),
            email: changes.email.as_deref(),
            password_hash: password_hash.as_deref(),
        },
    )
    .await?
    .ok_or(AppError::NotFound("User"))?;
    tx.commit().await?;

    state.cache.invalidate(keys::USERS_PATTERN).await;
    if changes.username.is_some() {
        // per-user product listings embed the owner's username
        state.cache.invalidate(keys::PRODUCTS_PATTERN).await;
    }
    tracing::info!(user_id = id, by = %identity.username, "user updated");

    Ok(Json(json!({ "message": "User updated", "user": updated })))
}

pub async fn delete(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = path?;
    let mut tx = state.db.begin().await?;

    let user = store::users::find_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    if !identity.may_act_for(user.id) {
        return Err(AppError::forbidden("You do not have permission to delete this user"));
    }

    store::users::delete(&mut *tx, id).await?;
    tx.commit().await?;

    // products cascade with their owner
    state.cache.invalidate(keys::USERS_PATTERN).await;
    state.cache.invalidate(keys::PRODUCTS_PATTERN).await;
    tracing::info!(user_id = id, by = %identity.username, "user deleted");

    Ok(Json(json!({ "message": "User deleted" })))
}

pub async fn cache_stats(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> Json<CacheStats> {
    Json(state.cache.stats())
}

pub async fn clear_cache(
    AdminUser(identity): AdminUser,
    State(state): State<AppState>,
) -> Json<Value> {
    let removed = state.cache.invalidate("*").await;
    tracing::info!(removed, by = %identity.username, "cache cleared");
    Json(json!({ "message": "Cache cleared", "removed": removed }))
}
