use serde::Deserialize;
use validator::Validate;

use super::lenient;
use crate::{
    db_helpers::{TruckFilter, TruckQuery},
    errors::{collect_field_errors, FieldError, RequestError},
    models::{Cuisine, TruckStatus},
};

pub const DEFAULT_PAGE_LIMIT: i64 = 6;
pub const MAX_PAGE_LIMIT: i64 = 100;
pub const MAX_AVERAGE_PRICE: f64 = 1000.0;

// ----------------- User Request -----------------
#[derive(Deserialize, Debug, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl RegisterRequest {
    pub fn validate_request(&self) -> Result<(), RequestError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_field_errors(&e),
        };
        if !self.username.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(FieldError::new(
                "username",
                "Username must contain only letters and numbers",
            ));
        }
        finish(errors)
    }
}

// ----------------- Food Truck Request -----------------

/// Body of create and update calls. Everything is optional at the serde level so
/// that missing fields surface as field errors instead of a parse rejection.
#[derive(Deserialize, Debug, Default, Validate)]
pub struct FoodTruckRequest {
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(
        min = 2,
        max = 100,
        message = "Food truck name must be between 2 and 100 characters"
    ))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub cuisine: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(min = 2, max = 100, message = "City must be between 2 and 100 characters"))]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 255, message = "Location cannot exceed 255 characters"))]
    pub current_location: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub menu: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 255, message = "Operating hours cannot exceed 255 characters"))]
    pub operating_hours: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
}

/// A validated set of mutable food truck fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFoodTruck {
    pub name: String,
    pub cuisine: Cuisine,
    pub city: String,
    pub current_location: Option<String>,
    pub average_price: Option<f64>,
    pub menu: Option<String>,
    pub operating_hours: Option<String>,
    pub status: TruckStatus,
    pub image: Option<String>,
}

impl FoodTruckRequest {
    pub fn validate_request(self) -> Result<NewFoodTruck, RequestError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_field_errors(&e),
        };

        if self.name.is_none() {
            errors.push(FieldError::new("name", "Food truck name is required"));
        }
        if self.city.is_none() {
            errors.push(FieldError::new("city", "City is required"));
        }
        let cuisine = match self.cuisine.as_deref() {
            None => {
                errors.push(FieldError::new("cuisine", "Cuisine type is required"));
                None
            }
            Some(raw) => {
                let parsed = raw.parse::<Cuisine>().ok();
                if parsed.is_none() {
                    errors.push(FieldError::new("cuisine", "Please select a valid cuisine type"));
                }
                parsed
            }
        };
        let status = match self.status.as_deref() {
            None => Some(TruckStatus::default()),
            Some(raw) => {
                let parsed = raw.parse::<TruckStatus>().ok();
                if parsed.is_none() {
                    errors.push(FieldError::new("status", "Status must be active or inactive"));
                }
                parsed
            }
        };
        if let Some(price) = self.average_price {
            errors.extend(check_average_price(price));
        }

        match (self.name, cuisine, self.city, status) {
            (Some(name), Some(cuisine), Some(city), Some(status)) if errors.is_empty() => {
                Ok(NewFoodTruck {
                    name,
                    cuisine,
                    city,
                    current_location: self.current_location,
                    average_price: self.average_price,
                    menu: self.menu,
                    operating_hours: self.operating_hours,
                    status,
                    image: self.image,
                })
            }
            _ => Err(RequestError::Validation(sorted(errors))),
        }
    }
}

fn check_average_price(price: f64) -> Option<FieldError> {
    if price <= 0.0 {
        return Some(FieldError::new(
            "average_price",
            "Average price must be a positive number",
        ));
    }
    if price > MAX_AVERAGE_PRICE {
        return Some(FieldError::new(
            "average_price",
            "Average price cannot exceed 1000",
        ));
    }
    let cents = price * 100.0;
    if (cents - cents.round()).abs() > 1e-6 {
        return Some(FieldError::new(
            "average_price",
            "Average price must have at most 2 decimal places",
        ));
    }
    None
}

// ----------------- Listing Query -----------------

/// Raw query string of the listing endpoint. Blank values count as absent.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct TruckListParams {
    pub search: Option<String>,
    pub cuisine: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl TruckListParams {
    pub fn into_query(self) -> Result<TruckQuery, RequestError> {
        let mut errors = Vec::new();
        let mut filters = Vec::new();

        if let Some(search) = present(self.search) {
            filters.push(TruckFilter::Search(search));
        }
        if let Some(raw) = present(self.cuisine) {
            match raw.parse::<Cuisine>() {
                Ok(cuisine) => filters.push(TruckFilter::Cuisine(cuisine)),
                Err(_) => errors.push(FieldError::new("cuisine", "Unknown cuisine type")),
            }
        }
        if let Some(city) = present(self.city) {
            filters.push(TruckFilter::City(city));
        }
        if let Some(raw) = present(self.status) {
            match raw.parse::<TruckStatus>() {
                Ok(status) => filters.push(TruckFilter::Status(status)),
                Err(_) => errors.push(FieldError::new("status", "Status must be active or inactive")),
            }
        }

        let page = positive_int(self.page, "page", 1, &mut errors);
        let limit = positive_int(self.limit, "limit", DEFAULT_PAGE_LIMIT, &mut errors)
            .min(MAX_PAGE_LIMIT);
        // SQLite takes OFFSET as a signed 64-bit integer.
        if (page - 1).checked_mul(limit).is_none() {
            errors.push(FieldError::new("page", "page is too large"));
        }

        finish(errors)?;
        Ok(TruckQuery::new(filters, page, limit))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_int(
    value: Option<String>,
    field: &'static str,
    default: i64,
    errors: &mut Vec<FieldError>,
) -> i64 {
    let Some(raw) = present(value) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => n,
        _ => {
            errors.push(FieldError::new(
                field,
                format!("{field} must be a positive integer"),
            ));
            default
        }
    }
}

fn sorted(mut errors: Vec<FieldError>) -> Vec<FieldError> {
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    errors
}

fn finish(errors: Vec<FieldError>) -> Result<(), RequestError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(RequestError::Validation(sorted(errors)))
    }
}
