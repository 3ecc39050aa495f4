use serde::Serialize;

use super::response::{Pagination, UserResponse};
use crate::ingest::IngestStats;

#[derive(Debug, Serialize)]
pub struct DataWrapper<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct PageWrapper<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct MessageWrapper {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatsWrapper {
    pub success: bool,
    pub message: &'static str,
    pub stats: IngestStats,
}

#[derive(Debug, Serialize)]
pub struct AuthWrapper {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserWrapper<T> {
    pub success: bool,
    pub user: T,
}

#[derive(Debug, Serialize)]
pub struct HealthWrapper {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
}

impl<T> DataWrapper<T> {
    pub fn wrap(data: T) -> Self {
        DataWrapper {
            success: true,
            message: None,
            data,
        }
    }

    pub fn wrap_with_message(message: &'static str, data: T) -> Self {
        DataWrapper {
            success: true,
            message: Some(message),
            data,
        }
    }
}

impl<T> PageWrapper<T> {
    pub fn wrap(data: Vec<T>, pagination: Pagination) -> Self {
        PageWrapper {
            success: true,
            data,
            pagination,
        }
    }
}

impl MessageWrapper {
    pub fn ok(message: &'static str) -> Self {
        MessageWrapper {
            success: true,
            message,
        }
    }
}

impl<T> UserWrapper<T> {
    pub fn wrap_with_user_data(user: T) -> UserWrapper<T> {
        UserWrapper {
            success: true,
            user,
        }
    }
}
