#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use catalog_api::{
    cache::{CacheLayer, MemoryStore},
    config::Config,
    models::user::Role,
    rest, store, AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

pub async fn spawn_app() -> TestApp {
    let config = Config::for_tests();
    let cache = CacheLayer::new(Arc::new(MemoryStore::new()), config.cache_ttl);
    spawn_app_with(config, cache).await
}

pub async fn spawn_app_with(config: Config, cache: CacheLayer) -> TestApp {
    let db = store::connect(&config.database_url)
        .await
        .expect("in-memory database");
    let state = AppState::new(db, cache, config);

    TestApp {
        router: rest::router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&body).unwrap())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Value {
        let response = self
            .call(
                Method::POST,
                "/api/users/register",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        response.json()["user"].clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .call(
                Method::POST,
                "/api/users/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());
        response.json()["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    /// Registers a user and returns `(user id, token)`.
    pub async fn user(&self, username: &str) -> (i64, String) {
        let user = self.register(username, "password").await;
        let token = self.login(username, "password").await;
        (user["id"].as_i64().unwrap(), token)
    }

    /// Registers a user, promotes it to admin and returns `(user id, token)`.
    pub async fn admin(&self, username: &str) -> (i64, String) {
        let user = self.register(username, "password").await;
        let id = user["id"].as_i64().unwrap();
        store::users::set_role(&self.state.db, id, Role::Admin)
            .await
            .unwrap();
        (id, self.login(username, "password").await)
    }

    pub async fn create_product(&self, token: &str, name: &str, price: f64) -> Value {
        let response = self
            .call(
                Method::POST,
                "/api/products",
                Some(token),
                Some(json!({ "name": name, "price": price, "stock": 5 })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        response.json()["product"].clone()
    }
}
