use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{auth, products, users},
    middleware::security::{enforce_https, security_headers},
    AppState,
};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/logout", post(auth::logout))
        .route("/users", get(users::list))
        .route("/users/private", get(users::private))
        .route("/users/me", get(users::me))
        .route("/users/cache/stats", get(users::cache_stats))
        .route("/users/cache/clear", post(users::clear_cache))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:id",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/user/:user_id", get(products::by_user));

    let mut app = Router::new()
        .nest("/api", api)
        .layer(from_fn(security_headers))
        .layer(TraceLayer::new_for_http());

    if state.config.production {
        app = app.layer(from_fn(enforce_https));
    }

    app.with_state(state)
}
