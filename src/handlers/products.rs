use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::SqliteConnection;

use crate::{
    cache::keys,
    error::AppError,
    middleware::{AuthUser, Identity},
    models::product::{Product, ProductPayload, UserProducts},
    store, AppState,
};

pub async fn create(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let new_product = payload.validate_new()?;

    let owner = store::users::find_by_id(&state.db, identity.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let product = store::products::insert(&state.db, owner.id, &new_product).await?;

    state.cache.invalidate(keys::PRODUCTS_PATTERN).await;
    tracing::info!(product_id = product.id, owner = %owner.username, "product created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created", "product": product })),
    ))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = state
        .cache
        .read_through(keys::PRODUCTS_ALL, || store::products::list(&state.db))
        .await?;
    Ok(Json(products))
}

pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(id) = path?;
    let product = state
        .cache
        .read_through(&keys::product(id), || async {
            store::products::find_by_id(&state.db, id)
                .await?
                .ok_or(AppError::NotFound("Product"))
        })
        .await?;
    Ok(Json(product))
}

pub async fn update(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    let mut tx = state.db.begin().await?;

    let product = load_for_change(&mut tx, id, &identity, "modify").await?;
    let changes = payload.validate_update()?;
    let updated = store::products::update(&mut *tx, product.id, &changes)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    tx.commit().await?;

    state.cache.invalidate(keys::PRODUCTS_PATTERN).await;
    tracing::info!(product_id = id, by = %identity.username, "product updated");

    Ok(Json(json!({ "message": "Product updated", "product": updated })))
}

pub async fn delete(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = path?;
    let mut tx = state.db.begin().await?;

    let product = load_for_change(&mut tx, id, &identity, "delete").await?;
    store::products::delete(&mut *tx, product.id).await?;
    tx.commit().await?;

    state.cache.invalidate(keys::PRODUCTS_PATTERN).await;
    tracing::info!(product_id = id, by = %identity.username, "product deleted");

    Ok(Json(json!({ "message": "Product deleted" })))
}

pub async fn by_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserProducts>, AppError> {
    let Path(user_id) = path?;
    let listing = state
        .cache
        .read_through(&keys::products_of_user(user_id), || async {
            let user = store::users::find_by_id(&state.db, user_id)
                .await?
                .ok_or(AppError::NotFound("User"))?;
            let products = store::products::list_by_user(&state.db, user_id).await?;
            Ok::<_, AppError>(UserProducts {
                user: user.username,
                total: products.len(),
                products,
            })
        })
        .await?;
    Ok(Json(listing))
}

/// Fetches the product and checks the caller owns it or is an admin.
async fn load_for_change(
    conn: &mut SqliteConnection,
    id: i64,
    identity: &Identity,
    action: &str,
) -> Result<Product, AppError> {
    let product = store::products::find_by_id(&mut *conn, id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    if !identity.may_act_for(product.user_id) {
        return Err(AppError::forbidden(format!(
            "You do not have permission to {action} this product"
        )));
    }

    Ok(product)
}
