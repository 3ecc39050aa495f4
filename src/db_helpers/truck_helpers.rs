use sqlx::SqlitePool;

use super::QueryBuilder;
use crate::{
    data_formats::{NewFoodTruck, Pagination},
    errors::RequestError,
    models::{Cuisine, FoodTruck, TruckStatus},
};

pub(super) const TRUCK_COLUMNS: &str = r#"
    SELECT ft.id, ft.name, ft.cuisine, ft.city, ft.current_location, ft.average_price,
           ft.menu, ft.operating_hours, ft.status, ft.image, ft.created_by,
           ft.created_at, ft.updated_at,
           u.username AS creator_username,
           (SELECT COUNT(*) FROM favorites fav WHERE fav.food_truck_id = ft.id) AS favorite_count
"#;

pub(super) const TRUCK_FROM: &str = "FROM food_trucks ft LEFT JOIN users u ON ft.created_by = u.id";

const TRUCK_ORDER: &str = "ORDER BY ft.created_at DESC, ft.id DESC";

/// One conjunct of the listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruckFilter {
    /// Case-insensitive substring of name, city or current location.
    Search(String),
    Cuisine(Cuisine),
    /// Case-insensitive substring of city.
    City(String),
    Status(TruckStatus),
}

impl TruckFilter {
    fn predicate(&self) -> &'static str {
        match self {
            TruckFilter::Search(_) => {
                r"(LOWER(ft.name) LIKE ? ESCAPE '\' OR LOWER(ft.city) LIKE ? ESCAPE '\' OR LOWER(ft.current_location) LIKE ? ESCAPE '\')"
            }
            TruckFilter::Cuisine(_) => "ft.cuisine = ?",
            TruckFilter::City(_) => r"LOWER(ft.city) LIKE ? ESCAPE '\'",
            TruckFilter::Status(_) => "ft.status = ?",
        }
    }

    fn params(&self) -> Vec<String> {
        match self {
            TruckFilter::Search(term) => {
                let pattern = contains_pattern(term);
                vec![pattern.clone(), pattern.clone(), pattern]
            }
            TruckFilter::Cuisine(cuisine) => vec![cuisine.as_str().to_owned()],
            TruckFilter::City(term) => vec![contains_pattern(term)],
            TruckFilter::Status(status) => vec![status.as_str().to_owned()],
        }
    }
}

/// `%term%` with LIKE metacharacters in the term escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Filters plus paging for the listing endpoint. The row query and the count
/// query are both rendered from the same WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct TruckQuery {
    filters: Vec<TruckFilter>,
    page: i64,
    limit: i64,
}

impl TruckQuery {
    pub fn new(filters: Vec<TruckFilter>, page: i64, limit: i64) -> Self {
        Self {
            filters,
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    #[cfg(test)]
    pub(crate) fn filters(&self) -> &[TruckFilter] {
        &self.filters
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows skipped before this page. Saturates instead of overflowing;
    /// `TruckListParams::into_query` rejects pages that would get there.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    fn where_clause(&self) -> (String, Vec<String>) {
        self.filters
            .iter()
            .fold(QueryBuilder::new("WHERE 1=1", " AND "), |builder, filter| {
                builder.add_clause(filter.predicate(), filter.params())
            })
            .build()
    }

    /// Page of rows; LIMIT and OFFSET are the two trailing placeholders.
    pub fn rows_sql(&self) -> (String, Vec<String>) {
        let (where_clause, params) = self.where_clause();
        (
            format!("{TRUCK_COLUMNS} {TRUCK_FROM} {where_clause} {TRUCK_ORDER} LIMIT ? OFFSET ?"),
            params,
        )
    }

    pub fn count_sql(&self) -> (String, Vec<String>) {
        let (where_clause, params) = self.where_clause();
        (format!("SELECT COUNT(*) {TRUCK_FROM} {where_clause}"), params)
    }
}

// ----------------- Food Truck Queries -----------------

pub async fn list_trucks_in_db(
    pool: &SqlitePool,
    query: &TruckQuery,
) -> Result<(Vec<FoodTruck>, Pagination), RequestError> {
    let mut tx = pool.begin().await?;

    let (count_sql, count_params) = query.count_sql();
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for param in count_params {
        count = count.bind(param);
    }
    let total = count.fetch_one(&mut *tx).await?;

    let (rows_sql, row_params) = query.rows_sql();
    let mut rows = sqlx::query_as::<_, FoodTruck>(&rows_sql);
    for param in row_params {
        rows = rows.bind(param);
    }
    let trucks = rows
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((trucks, Pagination::new(query.page(), query.limit(), total)))
}

pub async fn get_truck_by_id_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<FoodTruck>, RequestError> {
    let sql = format!("{TRUCK_COLUMNS} {TRUCK_FROM} WHERE ft.id = ?");
    let truck = sqlx::query_as::<_, FoodTruck>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(truck)
}

pub async fn create_truck_in_db(
    pool: &SqlitePool,
    owner_id: i64,
    truck: &NewFoodTruck,
) -> Result<FoodTruck, RequestError> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO food_trucks
            (name, cuisine, city, current_location, average_price, menu, operating_hours, status, image, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&truck.name)
    .bind(truck.cuisine)
    .bind(&truck.city)
    .bind(&truck.current_location)
    .bind(truck.average_price)
    .bind(&truck.menu)
    .bind(&truck.operating_hours)
    .bind(truck.status)
    .bind(&truck.image)
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    get_truck_by_id_in_db(pool, id)
        .await?
        .ok_or(RequestError::ServerError)
}

/// Full replace of the mutable fields. Ownership is checked by the caller.
pub async fn update_truck_in_db(
    pool: &SqlitePool,
    id: i64,
    truck: &NewFoodTruck,
) -> Result<FoodTruck, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        UPDATE food_trucks SET
            name = ?, cuisine = ?, city = ?, current_location = ?, average_price = ?,
            menu = ?, operating_hours = ?, status = ?, image = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&truck.name)
    .bind(truck.cuisine)
    .bind(&truck.city)
    .bind(&truck.current_location)
    .bind(truck.average_price)
    .bind(&truck.menu)
    .bind(&truck.operating_hours)
    .bind(truck.status)
    .bind(&truck.image)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Food truck not found"));
    }
    get_truck_by_id_in_db(pool, id)
        .await?
        .ok_or(RequestError::NotFound("Food truck not found"))
}

/// Favorites referencing the truck go with it through the foreign-key cascade.
pub async fn delete_truck_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM food_trucks WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Food truck not found"));
    }
    Ok(())
}
