use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::{
    ingest::{IngestRecord, IngestStats, RecordError, UpsertOutcome},
    models::{Cuisine, TruckStatus},
};

/// Matches on (name, city). A match gets the location, price and hours
/// overwritten while image, cuisine, menu and status only change when the
/// record carries a value. Otherwise a new row owned by `owner_id` is inserted.
pub async fn upsert_record(
    pool: &SqlitePool,
    owner_id: i64,
    record: &IngestRecord,
) -> Result<UpsertOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing =
        sqlx::query_scalar::<_, i64>("SELECT id FROM food_trucks WHERE name = ? AND city = ? ORDER BY id LIMIT 1")
            .bind(&record.name)
            .bind(&record.city)
            .fetch_optional(&mut *tx)
            .await?;

    let outcome = match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE food_trucks SET
                    current_location = ?,
                    average_price = ?,
                    operating_hours = ?,
                    image = COALESCE(?, image),
                    cuisine = COALESCE(?, cuisine),
                    menu = COALESCE(?, menu),
                    status = COALESCE(?, status),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(&record.current_location)
            .bind(record.average_price)
            .bind(&record.operating_hours)
            .bind(&record.image)
            .bind(record.cuisine)
            .bind(&record.menu)
            .bind(record.status)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            UpsertOutcome::Updated
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO food_trucks
                    (name, cuisine, city, current_location, average_price, menu, operating_hours, status, image, created_by)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.name)
            .bind(record.cuisine.unwrap_or(Cuisine::Other))
            .bind(&record.city)
            .bind(&record.current_location)
            .bind(record.average_price)
            .bind(&record.menu)
            .bind(&record.operating_hours)
            .bind(record.status.unwrap_or(TruckStatus::Active))
            .bind(&record.image)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
            UpsertOutcome::Inserted
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Upserts records one after another. A record that is invalid or fails to
/// write is counted in `errors` and the batch carries on.
pub async fn ingest_batch<I>(pool: &SqlitePool, owner_id: i64, records: I) -> IngestStats
where
    I: IntoIterator<Item = Result<IngestRecord, RecordError>>,
{
    let mut stats = IngestStats::default();
    for record in records {
        stats.total += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(index = stats.total - 1, "Skipping source record: {}", e);
                stats.errors += 1;
                continue;
            }
        };
        match upsert_record(pool, owner_id, &record).await {
            Ok(outcome) => stats.record(outcome),
            Err(e) => {
                error!(name = %record.name, city = %record.city, "Failed to upsert food truck: {}", e);
                stats.errors += 1;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db_helpers::get_truck_by_id_in_db, init_db};

    fn record(name: &str, city: &str) -> IngestRecord {
        IngestRecord {
            name: name.into(),
            city: city.into(),
            cuisine: None,
            current_location: Some("1 Rue A".into()),
            average_price: Some(9.5),
            operating_hours: Some("9-5".into()),
            image: Some("https://img.example/a.png".into()),
            menu: None,
            status: None,
        }
    }

    async fn truck_id(pool: &SqlitePool, name: &str, city: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM food_trucks WHERE name = ? AND city = ?")
            .bind(name)
            .bind(city)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn second_upsert_updates_the_same_row() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let first = record("Taco Loco", "Paris");
        assert_eq!(
            upsert_record(&pool, 1, &first).await.unwrap(),
            UpsertOutcome::Inserted
        );
        let id = truck_id(&pool, "Taco Loco", "Paris").await;
        let inserted = get_truck_by_id_in_db(&pool, id).await.unwrap().unwrap();
        assert_eq!(inserted.cuisine, Cuisine::Other);
        assert_eq!(inserted.status, TruckStatus::Active);
        assert_eq!(inserted.created_by, 1);

        let second = IngestRecord {
            current_location: Some("2 Rue B".into()),
            image: None,
            cuisine: Some(Cuisine::Tacos),
            ..record("Taco Loco", "Paris")
        };
        assert_eq!(
            upsert_record(&pool, 1, &second).await.unwrap(),
            UpsertOutcome::Updated
        );

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM food_trucks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let updated = get_truck_by_id_in_db(&pool, id).await.unwrap().unwrap();
        assert_eq!(updated.current_location.as_deref(), Some("2 Rue B"));
        assert_eq!(updated.image.as_deref(), Some("https://img.example/a.png"));
        assert_eq!(updated.cuisine, Cuisine::Tacos);
    }

    #[tokio::test]
    async fn update_without_cuisine_keeps_the_stored_one() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let first = IngestRecord {
            cuisine: Some(Cuisine::Pizza),
            ..record("Slice", "Lyon")
        };
        upsert_record(&pool, 1, &first).await.unwrap();
        upsert_record(&pool, 1, &record("Slice", "Lyon")).await.unwrap();

        let id = truck_id(&pool, "Slice", "Lyon").await;
        let truck = get_truck_by_id_in_db(&pool, id).await.unwrap().unwrap();
        assert_eq!(truck.cuisine, Cuisine::Pizza);
    }

    #[tokio::test]
    async fn batch_counts_failures_without_stopping() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let out_of_range = IngestRecord {
            average_price: Some(5000.0),
            ..record("Pricey", "Nice")
        };
        let stats = ingest_batch(
            &pool,
            1,
            vec![
                Ok(record("A", "Paris")),
                Err(RecordError::MissingField("city")),
                Ok(out_of_range),
                Ok(record("A", "Paris")),
            ],
        )
        .await;
        assert_eq!(
            stats,
            IngestStats {
                total: 4,
                inserted: 1,
                updated: 1,
                errors: 2,
            }
        );
    }
}
