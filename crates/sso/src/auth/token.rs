//! App-scoped session tokens.
//!
//! Tokens are HS256 JWTs signed with the calling application's shared secret,
//! so a token minted for one app never verifies against another app's secret.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{App, User};

/// Token errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The token is past its expiry.
    #[error("token expired")]
    Expired,

    /// Bad signature, malformed token or unexpected claims.
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub uid: i64,
    /// User email.
    pub email: String,
    /// Role claims at mint time.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Application the token is scoped to.
    pub app_id: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Mints signed, time-bounded tokens.
pub trait TokenIssuer: Send + Sync {
    /// Mint a token for `user`, scoped to `app` and valid for `ttl`.
    fn mint(&self, user: &User, app: &App, ttl: Duration) -> Result<String, TokenError>;
}

/// HS256 JWT [`TokenIssuer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtIssuer;

impl JwtIssuer {
    pub fn new() -> Self {
        Self
    }

    /// Mint a token as if issued at `issued_at`.
    pub fn mint_at(
        &self,
        user: &User,
        app: &App,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if app.secret.is_empty() {
            return Err(TokenError::Signing(format!(
                "app {} has an empty secret",
                app.id
            )));
        }

        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::Signing("ttl out of range".to_string()))?;
        let iat = issued_at.timestamp();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| TokenError::Signing("ttl out of range".to_string()))?;

        let claims = TokenClaims {
            uid: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            app_id: app.id,
            iat,
            exp,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(app.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl TokenIssuer for JwtIssuer {
    fn mint(&self, user: &User, app: &App, ttl: Duration) -> Result<String, TokenError> {
        self.mint_at(user, app, ttl, Utc::now())
    }
}

/// Verify a token against an application secret.
///
/// Only HS256 is accepted and expiry is checked without leeway.
pub fn verify_token(token: &str, secret: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.leeway = 0;

    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "a@x.com".to_string(),
            pass_hash: Vec::new(),
            roles: vec!["admin".to_string()],
        }
    }

    fn app(id: i64, secret: &str) -> App {
        App {
            id,
            name: format!("app-{id}"),
            secret: secret.to_string(),
        }
    }

    #[test]
    fn test_mint_and_verify() {
        let app_a = app(1, "secret-a");
        let token = JwtIssuer::new()
            .mint(&user(), &app_a, Duration::from_secs(3600))
            .unwrap();

        assert_eq!(token.split('.').count(), 3);

        let claims = verify_token(&token, "secret-a").unwrap();
        assert_eq!(claims.uid, 1);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.roles, vec!["admin"]);
        assert_eq!(claims.app_id, 1);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_other_app_secret_rejected() {
        let token = JwtIssuer::new()
            .mint(&user(), &app(1, "secret-a"), Duration::from_secs(3600))
            .unwrap();

        let err = verify_token(&token, "secret-b").unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn test_expired_token_rejected() {
        let issued_at = Utc::now() - chrono::Duration::hours(2);
        let token = JwtIssuer::new()
            .mint_at(&user(), &app(1, "secret-a"), Duration::from_secs(3600), issued_at)
            .unwrap();

        let err = verify_token(&token, "secret-a").unwrap_err();
        assert!(matches!(err, TokenError::Expired), "got {err:?}");
    }

    #[test]
    fn test_empty_secret_cannot_sign() {
        let err = JwtIssuer::new()
            .mint(&user(), &app(1, ""), Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            verify_token("not.a.jwt", "secret-a"),
            Err(TokenError::Invalid(_))
        ));
    }
}
