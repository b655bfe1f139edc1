mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn create_and_read_products() {
    let app = spawn_app().await;
    let (owner, token) = app.user("juan").await;

    let product = app.create_product(&token, "Keyboard", 49.5).await;
    assert_eq!(product["name"], "Keyboard");
    assert_eq!(product["price"], 49.5);
    assert_eq!(product["stock"], 5);
    assert_eq!(product["user_id"], owner);

    let id = product["id"].as_i64().unwrap();
    let response = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Keyboard");

    let response = app.get("/api/products", None).await;
    assert_eq!(response.json().as_array().unwrap().len(), 1);

    let response = app.get("/api/products/404", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "Product not found");
}

#[tokio::test]
async fn creating_requires_a_token() {
    let app = spawn_app().await;

    let response = app
        .call(
            Method::POST,
            "/api/products",
            None,
            Some(json!({ "name": "Mouse", "price": 10.0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_product_lists_field_errors() {
    let app = spawn_app().await;
    let (_, token) = app.user("juan").await;

    let response = app
        .call(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "name": "Mouse", "price": -1.0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["price"].is_array());

    let response = app
        .call(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "price": 3.0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["name"].is_array());
}

#[tokio::test]
async fn only_owner_or_admin_changes_a_product() {
    let app = spawn_app().await;
    let (_, owner) = app.user("juan").await;
    let (_, stranger) = app.user("ana").await;
    let (_, admin) = app.admin("root").await;

    let product = app.create_product(&owner, "Lamp", 20.0).await;
    let uri = format!("/api/products/{}", product["id"]);

    let response = app
        .call(Method::PUT, &uri, Some(&stranger), Some(json!({ "price": 1.0 })))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.json()["error"],
        "You do not have permission to modify this product"
    );
    assert_eq!(app.get(&uri, None).await.json()["price"], 20.0);

    let response = app.call(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .call(Method::PUT, &uri, Some(&owner), Some(json!({ "stock": 9 })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["product"]["stock"], 9);
    assert_eq!(response.json()["product"]["name"], "Lamp");

    let response = app
        .call(Method::PUT, &uri, Some(&admin), Some(json!({ "price": 25.0 })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.get(&uri, None).await.json()["price"], 25.0);

    let response = app.call(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["message"], "Product deleted");
    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn products_by_user_tracks_changes() {
    let app = spawn_app().await;
    let (owner_id, owner) = app.user("juan").await;
    let uri = format!("/api/products/user/{owner_id}");

    let response = app.get(&uri, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["user"], "juan");
    assert_eq!(response.json()["total"], 0);

    app.create_product(&owner, "Desk", 120.0).await;
    app.create_product(&owner, "Chair", 80.0).await;

    let response = app.get(&uri, None).await;
    assert_eq!(response.json()["total"], 2);
    assert_eq!(response.json()["products"].as_array().unwrap().len(), 2);

    let response = app.get("/api/products/user/999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_owner_removes_their_products() {
    let app = spawn_app().await;
    let (owner_id, owner) = app.user("juan").await;
    let (_, admin) = app.admin("root").await;

    let product = app.create_product(&owner, "Desk", 120.0).await;
    let uri = format!("/api/products/{}", product["id"]);
    // cached before the owner goes away
    assert_eq!(app.get(&uri, None).await.status, StatusCode::OK);

    let response = app
        .call(Method::DELETE, &format!("/api/users/{owner_id}"), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
    assert!(app.get("/api/products", None).await.json().as_array().unwrap().is_empty());
}
