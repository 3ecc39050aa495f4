use std::{env, fmt::Display, net::IpAddr, str::FromStr};

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::authentication::DEFAULT_JWT_EXPIRE_DAYS;

pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub host: IpAddr,
    pub port: u16,
    pub system_user_id: i64,
    pub ingest_api_key: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_expire_days =
            try_load("JWT_EXPIRE_DAYS", &DEFAULT_JWT_EXPIRE_DAYS.to_string())?;
        if jwt_expire_days < 1 {
            return Err(anyhow!("JWT_EXPIRE_DAYS must be at least 1"));
        }
        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://foodtrucks.db")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expire_days,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "3000")?,
            system_user_id: try_load("SYSTEM_USER_ID", "1")?,
            ingest_api_key: env::var("INGEST_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}
