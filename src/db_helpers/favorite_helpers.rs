use std::collections::HashSet;

use sqlx::SqlitePool;

use super::truck_helpers::{TRUCK_COLUMNS, TRUCK_FROM};
use super::{get_truck_by_id_in_db, is_foreign_key_violation, is_unique_violation};
use crate::{
    authentication::MaybeUser,
    data_formats::FoodTruckResponse,
    errors::RequestError,
    models::{Favorite, FoodTruck},
};

// ----------------- Overlay -----------------

/// Annotates rows with `is_favorited` by set membership. Without a favorite
/// set (anonymous caller) the flag is left out.
pub fn overlay_favorites(
    rows: Vec<FoodTruck>,
    favorites: Option<&HashSet<i64>>,
) -> Vec<FoodTruckResponse> {
    rows.into_iter()
        .map(|truck| {
            let is_favorited = favorites.map(|set| set.contains(&truck.id));
            FoodTruckResponse::new(truck, is_favorited)
        })
        .collect()
}

/// Rows that came out of the caller's own favorites list.
pub fn mark_all_favorited(rows: Vec<FoodTruck>) -> Vec<FoodTruckResponse> {
    rows.into_iter()
        .map(|truck| FoodTruckResponse::new(truck, Some(true)))
        .collect()
}

/// Fetches the caller's favorite set once, then overlays it on `rows`.
pub async fn annotate_trucks(
    pool: &SqlitePool,
    user: &MaybeUser,
    rows: Vec<FoodTruck>,
) -> Result<Vec<FoodTruckResponse>, RequestError> {
    match user.get_id() {
        None => Ok(overlay_favorites(rows, None)),
        Some(user_id) => {
            let favorites = favorite_ids_for_user(pool, user_id).await?;
            Ok(overlay_favorites(rows, Some(&favorites)))
        }
    }
}

pub async fn annotate_truck(
    pool: &SqlitePool,
    user: &MaybeUser,
    truck: FoodTruck,
) -> Result<FoodTruckResponse, RequestError> {
    let is_favorited = match user.get_id() {
        None => None,
        Some(user_id) => Some(is_favorited_in_db(pool, user_id, truck.id).await?),
    };
    Ok(FoodTruckResponse::new(truck, is_favorited))
}

// ----------------- Favorite Queries -----------------

pub async fn favorite_ids_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<HashSet<i64>, RequestError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT food_truck_id FROM favorites WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

pub async fn is_favorited_in_db(
    pool: &SqlitePool,
    user_id: i64,
    truck_id: i64,
) -> Result<bool, RequestError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ? AND food_truck_id = ?)",
    )
    .bind(user_id)
    .bind(truck_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Relies on the (user_id, food_truck_id) unique constraint, so two racing
/// requests still end with one row and one Conflict.
pub async fn add_favorite_in_db(
    pool: &SqlitePool,
    user_id: i64,
    truck_id: i64,
) -> Result<Favorite, RequestError> {
    if get_truck_by_id_in_db(pool, truck_id).await?.is_none() {
        return Err(RequestError::NotFound("Food truck not found"));
    }

    let mut tx = pool.begin().await?;
    let favorite = sqlx::query_as::<_, Favorite>(
        r#"
        INSERT INTO favorites (user_id, food_truck_id)
        VALUES (?, ?)
        RETURNING id, user_id, food_truck_id, created_at
        "#,
    )
    .bind(user_id)
    .bind(truck_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RequestError::Conflict("Food truck already in favorites")
        } else if is_foreign_key_violation(&e) {
            RequestError::NotFound("Food truck not found")
        } else {
            RequestError::DatabaseError(e)
        }
    })?;
    tx.commit().await?;

    Ok(favorite)
}

pub async fn remove_favorite_in_db(
    pool: &SqlitePool,
    user_id: i64,
    truck_id: i64,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND food_truck_id = ?")
        .bind(user_id)
        .bind(truck_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Favorite not found"));
    }
    Ok(())
}

pub async fn list_favorite_trucks_in_db(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<FoodTruck>, RequestError> {
    let sql = format!(
        "{TRUCK_COLUMNS} {TRUCK_FROM}
        JOIN favorites f ON f.food_truck_id = ft.id
        WHERE f.user_id = ?
        ORDER BY f.created_at DESC, f.id DESC"
    );
    let trucks = sqlx::query_as::<_, FoodTruck>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(trucks)
}
