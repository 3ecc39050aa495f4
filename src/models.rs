use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Cuisine {
    Burger,
    Tacos,
    Desserts,
    Pizza,
    Asian,
    Mexican,
    Italian,
    American,
    French,
    Other,
}

impl Cuisine {
    pub const ALL: [Cuisine; 10] = [
        Cuisine::Burger,
        Cuisine::Tacos,
        Cuisine::Desserts,
        Cuisine::Pizza,
        Cuisine::Asian,
        Cuisine::Mexican,
        Cuisine::Italian,
        Cuisine::American,
        Cuisine::French,
        Cuisine::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cuisine::Burger => "burger",
            Cuisine::Tacos => "tacos",
            Cuisine::Desserts => "desserts",
            Cuisine::Pizza => "pizza",
            Cuisine::Asian => "asian",
            Cuisine::Mexican => "mexican",
            Cuisine::Italian => "italian",
            Cuisine::American => "american",
            Cuisine::French => "french",
            Cuisine::Other => "other",
        }
    }
}

impl FromStr for Cuisine {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cuisine::ALL
            .into_iter()
            .find(|cuisine| cuisine.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Cuisine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TruckStatus {
    #[default]
    Active,
    Inactive,
}

impl TruckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckStatus::Active => "active",
            TruckStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for TruckStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TruckStatus::Active),
            "inactive" => Ok(TruckStatus::Inactive),
            _ => Err(()),
        }
    }
}

/// A food truck joined with its creator's username and its favorite count.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FoodTruck {
    pub id: i64,
    pub name: String,
    pub cuisine: Cuisine,
    pub city: String,
    pub current_location: Option<String>,
    pub average_price: Option<f64>,
    pub menu: Option<String>,
    pub operating_hours: Option<String>,
    pub status: TruckStatus,
    pub image: Option<String>,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub creator_username: Option<String>,
    pub favorite_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub food_truck_id: i64,
    pub created_at: NaiveDateTime,
}
