use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{FoodTruck, User};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FoodTruckResponse {
    #[serde(flatten)]
    pub truck: FoodTruck,
    /// Absent for anonymous callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
}

impl FoodTruckResponse {
    pub fn new(truck: FoodTruck, is_favorited: Option<bool>) -> Self {
        FoodTruckResponse {
            truck,
            is_favorited,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Serialize, Debug)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

impl From<User> for UserResponse {
    fn from(User {
        id, username, email, ..
    }: User) -> Self {
        UserResponse {
            id,
            username,
            email,
        }
    }
}

impl From<User> for CurrentUserResponse {
    fn from(
        User {
            id,
            username,
            email,
            created_at,
            ..
        }: User,
    ) -> Self {
        CurrentUserResponse {
            id,
            username,
            email,
            created_at,
        }
    }
}
