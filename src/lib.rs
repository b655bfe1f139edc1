pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rest;
pub mod store;
pub mod token;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::sqlite::SqlitePool;

use cache::{CacheLayer, MemoryStore, RedisStore};
use config::{CacheBackendKind, Config};
use models::user::Role;
use token::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
    pub cache: CacheLayer,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: SqlitePool, cache: CacheLayer, config: Config) -> Self {
        let tokens = TokenService::new(
            config.jwt_secret.as_bytes(),
            config.jwt_algorithm,
            config.jwt_lifetime,
        );

        Self {
            db,
            tokens: Arc::new(tokens),
            cache,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Builds the cache for the configured backend. An unreachable Redis leaves
/// the application running without a cache.
pub async fn build_cache(config: &Config) -> CacheLayer {
    match config.cache_backend {
        CacheBackendKind::Redis => match RedisStore::connect(&config.redis_url).await {
            Ok(store) => {
                tracing::info!(url = %config.redis_url, "redis cache connected");
                CacheLayer::new(Arc::new(store), config.cache_ttl)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, running without cache");
                CacheLayer::disabled()
            }
        },
        CacheBackendKind::Memory => {
            tracing::info!("using in-process memory cache");
            CacheLayer::new(Arc::new(MemoryStore::new()), config.cache_ttl)
        }
        CacheBackendKind::Disabled => {
            tracing::info!("cache disabled");
            CacheLayer::disabled()
        }
    }
}

/// Creates `username` as an admin, or promotes and re-keys an existing account.
pub async fn bootstrap_admin(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<(), error::AppError> {
    let password_hash = password::hash(password)?;
    let mut tx = db.begin().await?;

    match store::users::find_by_username(&mut *tx, username).await? {
        Some(user) => {
            store::users::update(
                &mut *tx,
                user.id,
                store::users::UserChanges {
                    password_hash: Some(&password_hash),
                    ..Default::default()
                },
            )
            .await?;
            store::users::set_role(&mut *tx, user.id, Role::Admin).await?;
            tracing::info!(%username, "existing user promoted to admin");
        }
        None => {
            store::users::insert(&mut *tx, username, None, &password_hash, Role::Admin).await?;
            tracing::info!(%username, "admin user created");
        }
    }

    tx.commit().await?;
    Ok(())
}
