use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode, Uri},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    authentication::{
        ensure_owner, hash_password_argon2, verify_password_argon2, AuthUser, JwtKeys, MaybeUser,
    },
    data_formats::{
        AuthWrapper, CurrentUserResponse, DataWrapper, FoodTruckRequest, FoodTruckResponse,
        HealthWrapper, LoginRequest, MessageWrapper, PageWrapper, RegisterRequest, StatsWrapper,
        TruckListParams, UserWrapper,
    },
    db_helpers::{
        add_favorite_in_db, annotate_truck, annotate_trucks, create_truck_in_db,
        delete_truck_in_db, get_truck_by_id_in_db, get_user_by_email, get_user_by_id,
        ingest_batch, insert_user, list_favorite_trucks_in_db, list_trucks_in_db,
        mark_all_favorited, remove_favorite_in_db, update_truck_in_db, user_exists_in_db,
    },
    errors::RequestError,
    ingest::{parse_batch, RecordError, ScrapedPlace},
    IngestSettings, JsonResponse,
};

type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<JsonResponse<T>, RequestError>;

const API_KEY_HEADER: &str = "x-api-key";
const TRUCK_NOT_FOUND: &str = "Food truck not found";
const BAD_CREDENTIALS: &str = "Invalid email or password";

// ----------------- Helper Handlers -----------------
pub async fn health() -> Json<HealthWrapper> {
    Json(HealthWrapper {
        success: true,
        message: "Server is running",
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

pub async fn not_found(uri: Uri) -> RequestError {
    warn!("No route for {}", uri);
    RequestError::NotFound("Route not found")
}

// ----------------- Auth Handlers -----------------
pub async fn register(
    State(pool): State<SqlitePool>,
    State(keys): State<Arc<JwtKeys>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> CreatedResult<AuthWrapper> {
    let Json(request) = payload?;
    request.validate_request()?;

    if user_exists_in_db(&pool, &request.email, &request.username).await? {
        return Err(RequestError::Conflict(
            "User with this email or username already exists",
        ));
    }

    let password_hash = hash_password_argon2(request.password).await.map_err(|e| {
        tracing::error!("Failed to hash password: {:#}", e);
        RequestError::ServerError
    })?;
    let user = insert_user(&pool, &request.username, &request.email, &password_hash).await?;
    let token = issue_token(&keys, user.id, &user.username, &user.email)?;
    info!(user_id = user.id, "Registered user {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(AuthWrapper {
            success: true,
            message: "User registered successfully",
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(pool): State<SqlitePool>,
    State(keys): State<Arc<JwtKeys>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> JsonResult<AuthWrapper> {
    let Json(request) = payload?;
    request.validate()?;

    let Some(user) = get_user_by_email(&pool, &request.email).await? else {
        return Err(RequestError::NotAuthorized(BAD_CREDENTIALS));
    };
    let is_password_correct = verify_password_argon2(request.password, &user.password_hash)
        .await
        .map_err(|e| {
            tracing::error!("Failed to verify password: {:#}", e);
            RequestError::ServerError
        })?;
    if !is_password_correct {
        return Err(RequestError::NotAuthorized(BAD_CREDENTIALS));
    }

    let token = issue_token(&keys, user.id, &user.username, &user.email)?;
    Ok(Json(AuthWrapper {
        success: true,
        message: "Login successful",
        token,
        user: user.into(),
    }))
}

pub async fn get_current_user(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
) -> JsonResult<UserWrapper<CurrentUserResponse>> {
    let user = get_user_by_id(&pool, claims.id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    Ok(Json(UserWrapper::wrap_with_user_data(user.into())))
}

fn issue_token(
    keys: &JwtKeys,
    id: i64,
    username: &str,
    email: &str,
) -> Result<String, RequestError> {
    keys.generate(id, username, email).map_err(|e| {
        tracing::error!("{:#}", e);
        RequestError::ServerError
    })
}

// ----------------- Food Truck Handlers -----------------
pub async fn list_trucks(
    State(pool): State<SqlitePool>,
    maybe_user: MaybeUser,
    Query(params): Query<TruckListParams>,
) -> JsonResult<PageWrapper<FoodTruckResponse>> {
    let query = params.into_query()?;
    let (rows, pagination) = list_trucks_in_db(&pool, &query).await?;
    let rows = annotate_trucks(&pool, &maybe_user, rows).await?;
    Ok(Json(PageWrapper::wrap(rows, pagination)))
}

pub async fn get_truck(
    State(pool): State<SqlitePool>,
    maybe_user: MaybeUser,
    id: Result<Path<i64>, PathRejection>,
) -> JsonResult<DataWrapper<FoodTruckResponse>> {
    let Path(id) = id?;
    let truck = get_truck_by_id_in_db(&pool, id)
        .await?
        .ok_or(RequestError::NotFound(TRUCK_NOT_FOUND))?;
    let truck = annotate_truck(&pool, &maybe_user, truck).await?;
    Ok(Json(DataWrapper::wrap(truck)))
}

pub async fn create_truck(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<FoodTruckRequest>, JsonRejection>,
) -> CreatedResult<DataWrapper<FoodTruckResponse>> {
    let Json(request) = payload?;
    let new_truck = request.validate_request()?;
    let truck = create_truck_in_db(&pool, claims.id, &new_truck).await?;
    info!(truck_id = truck.id, user_id = claims.id, "Created food truck");
    Ok((
        StatusCode::CREATED,
        Json(DataWrapper::wrap_with_message(
            "Food truck created successfully",
            FoodTruckResponse::new(truck, None),
        )),
    ))
}

pub async fn update_truck(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<FoodTruckRequest>, JsonRejection>,
) -> JsonResult<DataWrapper<FoodTruckResponse>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let new_truck = request.validate_request()?;

    let existing = get_truck_by_id_in_db(&pool, id)
        .await?
        .ok_or(RequestError::NotFound(TRUCK_NOT_FOUND))?;
    ensure_owner(
        &existing,
        &claims,
        "You are not authorized to update this food truck",
    )?;

    let truck = update_truck_in_db(&pool, id, &new_truck).await?;
    Ok(Json(DataWrapper::wrap_with_message(
        "Food truck updated successfully",
        FoodTruckResponse::new(truck, None),
    )))
}

pub async fn delete_truck(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> JsonResult<MessageWrapper> {
    let Path(id) = id?;
    let existing = get_truck_by_id_in_db(&pool, id)
        .await?
        .ok_or(RequestError::NotFound(TRUCK_NOT_FOUND))?;
    ensure_owner(
        &existing,
        &claims,
        "You are not authorized to delete this food truck",
    )?;

    delete_truck_in_db(&pool, id).await?;
    info!(truck_id = id, user_id = claims.id, "Deleted food truck");
    Ok(Json(MessageWrapper::ok("Food truck deleted successfully")))
}

// ----------------- Favorite Handlers -----------------
pub async fn add_favorite(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
    truck_id: Result<Path<i64>, PathRejection>,
) -> CreatedResult<MessageWrapper> {
    let Path(truck_id) = truck_id?;
    let favorite = add_favorite_in_db(&pool, claims.id, truck_id).await?;
    info!(
        favorite_id = favorite.id,
        user_id = favorite.user_id,
        truck_id = favorite.food_truck_id,
        "Added favorite"
    );
    Ok((
        StatusCode::CREATED,
        Json(MessageWrapper::ok("Food truck added to favorites")),
    ))
}

pub async fn remove_favorite(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
    truck_id: Result<Path<i64>, PathRejection>,
) -> JsonResult<MessageWrapper> {
    let Path(truck_id) = truck_id?;
    remove_favorite_in_db(&pool, claims.id, truck_id).await?;
    Ok(Json(MessageWrapper::ok("Food truck removed from favorites")))
}

pub async fn my_favorites(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
) -> JsonResult<DataWrapper<Vec<FoodTruckResponse>>> {
    let rows = list_favorite_trucks_in_db(&pool, claims.id).await?;
    Ok(Json(DataWrapper::wrap(mark_all_favorited(rows))))
}

// ----------------- Ingestion Handlers -----------------
pub async fn ingest_trucks(
    State(pool): State<SqlitePool>,
    State(settings): State<Arc<IngestSettings>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> JsonResult<StatsWrapper> {
    if let Some(expected) = settings.api_key.as_deref() {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            return Err(RequestError::NotAuthorized("Invalid or missing API key"));
        }
    }

    let Json(mut body) = payload?;
    let trucks = match body.get_mut("trucks").map(Value::take) {
        Some(Value::Array(trucks)) if !trucks.is_empty() => trucks,
        _ => {
            return Err(RequestError::BadRequest(
                "No trucks provided or invalid format. Expected { trucks: [] }".to_string(),
            ))
        }
    };

    let stats = ingest_batch(&pool, settings.system_user_id, parse_batch(trucks)).await;
    info!(
        total = stats.total,
        inserted = stats.inserted,
        updated = stats.updated,
        errors = stats.errors,
        "Ingestion complete"
    );
    Ok(Json(StatsWrapper {
        success: true,
        message: "Ingestion complete",
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ScraperImportRequest {
    #[serde(default)]
    pub places: Vec<Value>,
}

pub async fn import_scraped(
    State(pool): State<SqlitePool>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<ScraperImportRequest>, JsonRejection>,
) -> JsonResult<StatsWrapper> {
    let Json(request) = payload?;
    if request.places.is_empty() {
        return Err(RequestError::BadRequest(
            "No places provided. Expected { places: [] }".to_string(),
        ));
    }

    let records = request.places.into_iter().map(|place| {
        serde_json::from_value::<ScrapedPlace>(place)
            .map_err(RecordError::from)
            .and_then(ScrapedPlace::into_record)
    });
    let stats = ingest_batch(&pool, claims.id, records).await;
    info!(
        user_id = claims.id,
        inserted = stats.inserted,
        updated = stats.updated,
        errors = stats.errors,
        "Scraper import complete"
    );
    Ok(Json(StatsWrapper {
        success: true,
        message: "Import complete",
        stats,
    }))
}
