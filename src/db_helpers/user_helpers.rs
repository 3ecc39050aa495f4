use sqlx::SqlitePool;

use super::is_unique_violation;
use crate::{errors::RequestError, models::User};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn user_exists_in_db(
    pool: &SqlitePool,
    email: &str,
    username: &str,
) -> Result<bool, RequestError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? OR username = ?)",
    )
    .bind(email)
    .bind(username)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// `password_hash` must already be hashed.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let sql = format!(
        "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?) RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RequestError::Conflict("User with this email or username already exists")
            } else {
                RequestError::DatabaseError(e)
            }
        })?;
    tx.commit().await?;
    Ok(user)
}
