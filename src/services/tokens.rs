// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token issuance and verification.
//!
//! Access tokens are short-lived (15 minutes) and stateless. Refresh tokens
//! live for 7 days, carry a `jti` so they can be consumed exactly once, and
//! are signed with a separate secret so neither key can forge the other
//! kind of token.

use crate::models::Role;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token lifetime: 15 minutes
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh token lifetime: 7 days
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Distinguishes access from refresh tokens inside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Refresh token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Unique token ID, consumed on rotation
    pub jti: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    pub iat: u64,
    pub exp: u64,
}

/// A freshly minted refresh token.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub jti: String,
    /// Expiration (Unix timestamp)
    pub expires_at: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("System clock is before the Unix epoch")]
    Clock,
}

impl From<TokenError> for crate::error::AppError {
    fn from(err: TokenError) -> Self {
        crate::error::AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenService {
    /// Build from the two signing secrets.
    ///
    /// Callers are expected to have rejected identical or empty secrets via
    /// [`crate::config::Config::validate`].
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
            access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: REFRESH_TOKEN_TTL_SECS,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_refresh_secret)
    }

    /// Override lifetimes (tests exercising expiry).
    pub fn with_ttls(mut self, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        self.access_ttl_secs = access_ttl_secs;
        self.refresh_ttl_secs = refresh_ttl_secs;
        self
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    pub fn issue_access_token(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
    ) -> Result<String, TokenError> {
        let now = unix_now()?;
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            kind: TokenKind::Access,
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access.encoding,
        )?)
    }

    pub fn issue_refresh_token(&self, user_id: &str) -> Result<IssuedRefreshToken, TokenError> {
        let now = unix_now()?;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            kind: TokenKind::Refresh,
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.refresh.encoding,
        )?;

        Ok(IssuedRefreshToken {
            token,
            jti: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Verify an access token. Any failure yields `None`.
    pub fn verify_access_token(&self, token: &str) -> Option<AccessClaims> {
        let claims = decode::<AccessClaims>(token, &self.access.decoding, &validation())
            .ok()?
            .claims;

        if claims.kind != TokenKind::Access || claims.sub.is_empty() {
            tracing::debug!("Rejected access token with unexpected claims");
            return None;
        }
        Some(claims)
    }

    /// Verify a refresh token. Any failure yields `None`.
    pub fn verify_refresh_token(&self, token: &str) -> Option<RefreshClaims> {
        let claims = decode::<RefreshClaims>(token, &self.refresh.decoding, &validation())
            .ok()?
            .claims;

        if claims.kind != TokenKind::Refresh || claims.sub.is_empty() || claims.jti.is_empty() {
            tracing::debug!("Rejected refresh token with unexpected claims");
            return None;
        }
        Some(claims)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}

fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::Clock)?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_KEY: &[u8] = b"access_key_for_unit_tests_32bytes";
    const REFRESH_KEY: &[u8] = b"refresh_key_for_unit_tests_32byte";

    fn service() -> TokenService {
        TokenService::new(ACCESS_KEY, REFRESH_KEY)
    }

    fn sign(claims: &serde_json::Value, key: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_roundtrip() {
        let tokens = service();
        let token = tokens
            .issue_access_token("user-1", "a@b.com", Role::Admin)
            .unwrap();

        let claims = tokens.verify_access_token(&token).expect("token verifies");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_refresh_token_roundtrip() {
        let tokens = service();
        let issued = tokens.issue_refresh_token("user-1").unwrap();

        let claims = tokens
            .verify_refresh_token(&issued.token)
            .expect("token verifies");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp, issued.expires_at);
        assert_eq!(claims.exp - claims.iat, REFRESH_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let tokens = service();
        let a = tokens.issue_refresh_token("user-1").unwrap();
        let b = tokens.issue_refresh_token("user-1").unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_secret_separation() {
        let tokens = service();
        let access = tokens
            .issue_access_token("user-1", "a@b.com", Role::User)
            .unwrap();
        let refresh = tokens.issue_refresh_token("user-1").unwrap().token;

        assert!(tokens.verify_refresh_token(&access).is_none());
        assert!(tokens.verify_access_token(&refresh).is_none());
    }

    #[test]
    fn test_kind_checked_even_with_shared_secret() {
        // A misconfigured deployment with one secret must still not accept
        // refresh tokens as access tokens.
        let tokens = TokenService::new(ACCESS_KEY, ACCESS_KEY);
        let refresh = tokens.issue_refresh_token("user-1").unwrap().token;
        assert!(tokens.verify_access_token(&refresh).is_none());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = service();
        let token = tokens
            .issue_access_token("user-1", "a@b.com", Role::User)
            .unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = serde_json::json!({
            "sub": "user-1", "email": "a@b.com", "role": "admin",
            "typ": "access", "iat": 0, "exp": u32::MAX,
        });
        let resigned = sign(&forged, b"attacker_key");
        parts[1] = resigned.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");

        assert!(tokens.verify_access_token(&tampered).is_none());
        assert!(tokens.verify_access_token("not.a.token").is_none());
        assert!(tokens.verify_access_token("").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = unix_now().unwrap();
        let expired = sign(
            &serde_json::json!({
                "sub": "user-1", "email": "a@b.com", "role": "user",
                "typ": "access", "iat": now - 1000, "exp": now - 10,
            }),
            ACCESS_KEY,
        );
        assert!(service().verify_access_token(&expired).is_none());
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let now = unix_now().unwrap();
        let expired = sign(
            &serde_json::json!({
                "sub": "user-1", "jti": "j1", "typ": "refresh",
                "iat": now - 1000, "exp": now - 10,
            }),
            REFRESH_KEY,
        );
        assert!(service().verify_refresh_token(&expired).is_none());
    }

    #[test]
    fn test_missing_claims_rejected() {
        let now = unix_now().unwrap();
        // No email/role.
        let partial = sign(
            &serde_json::json!({
                "sub": "user-1", "typ": "access", "iat": now, "exp": now + 60,
            }),
            ACCESS_KEY,
        );
        assert!(service().verify_access_token(&partial).is_none());

        // No jti.
        let partial = sign(
            &serde_json::json!({
                "sub": "user-1", "typ": "refresh", "iat": now, "exp": now + 60,
            }),
            REFRESH_KEY,
        );
        assert!(service().verify_refresh_token(&partial).is_none());

        // No exp.
        let partial = sign(
            &serde_json::json!({
                "sub": "user-1", "email": "a@b.com", "role": "user",
                "typ": "access", "iat": now,
            }),
            ACCESS_KEY,
        );
        assert!(service().verify_access_token(&partial).is_none());
    }

    #[test]
    fn test_empty_subject_rejected() {
        let tokens = service();
        let token = tokens.issue_access_token("", "a@b.com", Role::User).unwrap();
        assert!(tokens.verify_access_token(&token).is_none());
    }
}
