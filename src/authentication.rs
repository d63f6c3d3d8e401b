use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{config::AuthConfig, errors::RequestError, models::UserId, AppState};

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    id: UserId,
    exp: i64,
}

/// Issues and verifies bearer tokens.
pub struct AuthService {
    secret: String,
    expiry: time::Duration,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        AuthService {
            secret: config.jwt_secret.clone(),
            expiry: time::Duration::days(config.token_expiry_days),
        }
    }

    pub fn issue_token(&self, id: UserId) -> Result<String> {
        let expiry_date = OffsetDateTime::now_utc() + self.expiry;
        let claim = AuthClaim {
            id,
            exp: expiry_date.unix_timestamp(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claim,
            &jsonwebtoken::EncodingKey::from_secret(self.secret.as_ref()),
        )
        .context("Failed to generate jwt token")
    }

    pub fn verify_token(&self, token: &str) -> Result<UserId, RequestError> {
        let token_data = jsonwebtoken::decode::<AuthClaim>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(self.secret.as_ref()),
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    RequestError::NotAuthorized("Token expired")
                }
                _ => RequestError::NotAuthorized("Invalid token"),
            }
        })?;
        Ok(token_data.claims.id)
    }
}

/// The verified caller of a protected route.
#[derive(Debug)]
pub struct AuthUser {
    pub id: UserId,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<AppState>()
            .ok_or(RequestError::ServerError)?;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(RequestError::NotAuthorized("Authentication required"))?
            .to_str()
            .map_err(|_| RequestError::NotAuthorized("Invalid token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(RequestError::NotAuthorized("Invalid token"))?;

        let id = state.auth.verify_token(token.trim())?;
        Ok(AuthUser { id })
    }
}

pub async fn verify_password_argon2(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Stored password hash is malformed"))?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, days: i64) -> AuthService {
        AuthService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            token_expiry_days: days,
        })
    }

    #[test]
    fn issued_token_verifies_to_same_id() {
        let auth = service("secret", 1);
        let token = auth.issue_token(42).unwrap();
        assert_eq!(auth.verify_token(&token).unwrap(), 42);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = service("one", 1).issue_token(7).unwrap();
        let err = service("two", 1).verify_token(&token).unwrap_err();
        assert!(matches!(err, RequestError::NotAuthorized("Invalid token")));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = service("secret", -2).issue_token(7).unwrap();
        let err = service("secret", 1).verify_token(&token).unwrap_err();
        assert!(matches!(err, RequestError::NotAuthorized("Token expired")));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password_argon2("hunter22".to_string()).await.unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password_argon2("hunter22".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_argon2("hunter23".to_string(), hash)
            .await
            .unwrap());
    }
}
