use sqlx::SqliteExecutor;

use crate::models::product::{NewProduct, Product, ProductPayload};

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, user_id, created_at FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e>(executor: impl SqliteExecutor<'e>) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, user_id, created_at FROM products ORDER BY id",
    )
    .fetch_all(executor)
    .await
}

pub async fn list_by_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, user_id, created_at FROM products \
         WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn insert<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    product: &NewProduct,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, description, price, stock, user_id) VALUES (?, ?, ?, ?, ?) \
         RETURNING id, name, description, price, stock, user_id, created_at",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn update<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    changes: &ProductPayload,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET \
            name = COALESCE(?, name), \
            description = COALESCE(?, description), \
            price = COALESCE(?, price), \
            stock = COALESCE(?, stock) \
         WHERE id = ? \
         RETURNING id, name, description, price, stock, user_id, created_at",
    )
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(changes.price)
    .bind(changes.stock)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
