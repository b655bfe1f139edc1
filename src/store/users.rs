use sqlx::SqliteExecutor;

use crate::models::user::{Role, User};

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_username<'e>(
    executor: impl SqliteExecutor<'e>,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, role, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e>(executor: impl SqliteExecutor<'e>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, role, created_at FROM users ORDER BY id",
    )
    .fetch_all(executor)
    .await
}

pub async fn insert<'e>(
    executor: impl SqliteExecutor<'e>,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
    role: Role,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?) \
         RETURNING id, username, email, password_hash, role, created_at",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(executor)
    .await
}

#[derive(Debug, Default)]
pub struct UserChanges<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
}

/// Applies the provided fields; `None` leaves a column untouched.
pub async fn update<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    changes: UserChanges<'_>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET \
            username = COALESCE(?, username), \
            email = COALESCE(?, email), \
            password_hash = COALESCE(?, password_hash) \
         WHERE id = ? \
         RETURNING id, username, email, password_hash, role, created_at",
    )
    .bind(changes.username)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn set_role<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    role: Role,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Products owned by the user go with it (`ON DELETE CASCADE`).
pub async fn delete<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
