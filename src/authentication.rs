use std::{convert::Infallible, sync::Arc};

use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::RequestError;

pub const DEFAULT_JWT_EXPIRE_DAYS: i64 = 7;

/// Identity carried inside a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtKeys {
    secret: String,
    expiry: time::Duration,
}

impl JwtKeys {
    pub fn new(secret: impl Into<String>, expiry: time::Duration) -> Self {
        Self {
            secret: secret.into(),
            expiry,
        }
    }

    pub fn generate(&self, id: i64, username: &str, email: &str) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            id,
            username: username.to_owned(),
            email: email.to_owned(),
            iat: now.unix_timestamp(),
            exp: (now + self.expiry).unix_timestamp(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate jwt token")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, RequestError> {
        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(self.secret.as_bytes()),
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            RequestError::Forbidden("Invalid or expired token")
        })?;
        Ok(token_data.claims)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Required authentication: rejects with 401 when no token is sent and 403
/// when the token does not verify.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = RequestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or(RequestError::NotAuthorized("Access denied. No token provided."))?;
        let keys = <Arc<JwtKeys> as FromRef<S>>::from_ref(state);
        keys.verify(token).map(AuthUser)
    }
}

/// Optional authentication for public reads. Never rejects; a missing or bad
/// token simply yields `Anonymous`.
#[derive(Debug, Clone)]
pub enum MaybeUser {
    Anonymous,
    Authenticated(Claims),
}

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        match self {
            MaybeUser::Anonymous => None,
            MaybeUser::Authenticated(claims) => Some(claims.id),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser::Anonymous);
        };
        let keys = <Arc<JwtKeys> as FromRef<S>>::from_ref(state);
        Ok(match keys.verify(token) {
            Ok(claims) => MaybeUser::Authenticated(claims),
            Err(_) => MaybeUser::Anonymous,
        })
    }
}

/// Anything with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for crate::models::FoodTruck {
    fn owner_id(&self) -> i64 {
        self.created_by
    }
}

pub fn is_owner<R: Owned>(resource: &R, requester: &Claims) -> bool {
    resource.owner_id() == requester.id
}

pub fn ensure_owner<R: Owned>(
    resource: &R,
    requester: &Claims,
    message: &'static str,
) -> Result<(), RequestError> {
    if is_owner(resource, requester) {
        Ok(())
    } else {
        Err(RequestError::Forbidden(message))
    }
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        // Seeded accounts store a non-PHC placeholder; treat it as a mismatch.
        let Ok(hash) = PasswordHash::new(hash.as_str()) else {
            return Ok(false);
        };
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}
