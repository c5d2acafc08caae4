// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: login, logout, refresh, who-am-I and profile update.
//!
//! Tokens travel in httpOnly cookies. Login also returns them in the body
//! for non-browser clients.

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::cookies;
use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::models::user::{default_name_for, is_plausible_email, normalize_email};
use crate::models::{PublicUser, Role, User};
use crate::services::{hash_password, verify_password};
use crate::AppState;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/refresh", post(refresh))
        .route(
            "/api/auth/profile",
            put(update_profile).route_layer(middleware::from_fn_with_state(state, require_auth)),
        )
}

// ─── Request / Response Bodies ───────────────────────────────

/// Login request body. Fields are optional so that a missing field is a
/// validation error rather than a JSON rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Validate)]
struct Credentials {
    #[validate(custom(function = "email_shape", message = "Please enter a valid email"))]
    email: String,
    password: String,
}

fn email_shape(email: &str) -> std::result::Result<(), ValidationError> {
    if is_plausible_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserEnvelope {
    pub user: PublicUser,
}

/// Who-am-I response; `user` is `null` when there is no usable session.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user: Option<PublicUser>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Profile update body. Blank fields count as absent.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
}

#[derive(Debug, Validate)]
struct ProfileChanges {
    #[validate(length(max = 50, message = "Name cannot exceed 50 characters"))]
    name: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: Option<String>,
    current_password: Option<String>,
}

impl From<ProfileUpdate> for ProfileChanges {
    fn from(req: ProfileUpdate) -> Self {
        Self {
            name: req
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            password: req.password.filter(|p| !p.is_empty()),
            current_password: req.current_password.filter(|p| !p.is_empty()),
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// Mint a fresh token pair and attach it to the jar.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, String, String)> {
    let access = state
        .tokens
        .issue_access_token(&user.id, &user.email, user.role)?;
    let refresh = state.tokens.issue_refresh_token(&user.id)?;

    let jar = cookies::with_session(
        jar,
        access.clone(),
        state.tokens.access_ttl_secs(),
        refresh.token.clone(),
        state.tokens.refresh_ttl_secs(),
        state.config.secure_cookies,
    );
    Ok((jar, access, refresh.token))
}

/// Log in, creating the account on first use when auto-registration is on.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let Json(req) = payload?;

    let email = req
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty());
    let password = req.password.filter(|p| !p.trim().is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    let credentials = Credentials { email, password };
    credentials.validate()?;

    let user = match state.db.find_user_by_email(&credentials.email).await? {
        Some(user) => {
            if !verify_password(&credentials.password, &user.password_hash).await? {
                tracing::info!(user_id = %user.id, "Login rejected: wrong password");
                return Err(AppError::InvalidCredentials);
            }
            user
        }
        None if state.config.allow_auto_register => {
            let hash = hash_password(&credentials.password).await?;
            let user = User::new(
                credentials.email.clone(),
                hash,
                default_name_for(&credentials.email),
                Role::Admin,
            );
            state.db.create_user(&user).await?;
            tracing::info!(user_id = %user.id, "Auto-registered account on first login");
            user
        }
        None => {
            tracing::info!("Login rejected: unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    let (jar, token, refresh_token) = start_session(&state, jar, &user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar,
        Json(LoginResponse {
            user: user.public(),
            token,
            refresh_token,
        }),
    ))
}

/// Clear the session. Always succeeds.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    if let Some(claims) = cookies::refresh_token(&jar)
        .and_then(|token| state.tokens.verify_refresh_token(&token))
    {
        match state
            .db
            .consume_refresh_token(&claims.sub, &claims.jti, claims.exp)
            .await
        {
            Ok(_) => tracing::debug!(user_id = %claims.sub, "Refresh token revoked on logout"),
            Err(e) => {
                tracing::warn!(user_id = %claims.sub, error = %e, "Failed to revoke refresh token")
            }
        }
    }

    let jar = cookies::without_session(jar, state.config.secure_cookies);
    (jar, Json(LogoutResponse { success: true }))
}

/// Current user, or `null` on any failure.
async fn me(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<MeResponse> {
    let Some(claims) = cookies::access_token(&jar)
        .and_then(|token| state.tokens.verify_access_token(&token))
    else {
        return Json(MeResponse { user: None });
    };

    let user = match state.db.get_user(&claims.sub).await {
        Ok(Some(user)) => Some(user.public()),
        Ok(None) => {
            tracing::info!(user_id = %claims.sub, "Session refers to missing user");
            None
        }
        Err(e) => {
            tracing::warn!(user_id = %claims.sub, error = %e, "User lookup failed");
            None
        }
    };

    Json(MeResponse { user })
}

/// Exchange the refresh cookie for a rotated token pair.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<UserEnvelope>)> {
    let token = cookies::refresh_token(&jar).ok_or(AppError::NotAuthenticated)?;
    let claims = state
        .tokens
        .verify_refresh_token(&token)
        .ok_or(AppError::InvalidToken)?;

    let consumed = state
        .db
        .consume_refresh_token(&claims.sub, &claims.jti, claims.exp)
        .await?;
    if !consumed {
        tracing::warn!(user_id = %claims.sub, "Rejected reuse of refresh token");
        return Err(AppError::InvalidToken);
    }

    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or(AppError::SessionUserMissing)?;

    let (jar, _, _) = start_session(&state, jar, &user)?;
    tracing::debug!(user_id = %user.id, "Session refreshed");

    Ok((jar, Json(UserEnvelope { user: user.public() })))
}

/// Update display name and/or password.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserEnvelope>> {
    let Json(req) = payload?;
    let changes = ProfileChanges::from(req);
    changes.validate()?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if let Some(name) = changes.name {
        user.name = name;
    }

    if let Some(password) = changes.password {
        let current = changes.current_password.ok_or_else(|| {
            AppError::Validation("Current password is required to change password".to_string())
        })?;
        if !verify_password(&current, &user.password_hash).await? {
            return Err(AppError::IncorrectPassword);
        }
        user.password_hash = hash_password(&password).await?;
        tracing::info!(user_id = %user.id, "Password changed");
    }

    user.touch();
    state.db.update_user(&user).await?;

    Ok(Json(UserEnvelope { user: user.public() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_changes_treat_blank_as_absent() {
        let changes = ProfileChanges::from(ProfileUpdate {
            name: Some("   ".to_string()),
            password: Some(String::new()),
            current_password: Some(String::new()),
        });
        assert!(changes.name.is_none());
        assert!(changes.password.is_none());
        assert!(changes.current_password.is_none());
        assert!(changes.validate().is_ok());
    }

    #[test]
    fn test_profile_changes_limits() {
        let changes = ProfileChanges::from(ProfileUpdate {
            name: Some("x".repeat(51)),
            ..Default::default()
        });
        assert!(changes.validate().is_err());

        let changes = ProfileChanges::from(ProfileUpdate {
            password: Some("short".to_string()),
            ..Default::default()
        });
        assert!(changes.validate().is_err());
    }

    #[test]
    fn test_credentials_email_format() {
        let bad = Credentials {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        assert!(bad.validate().is_err());

        let dotless = Credentials {
            email: "chef@localhost".to_string(),
            password: "secret1".to_string(),
        };
        assert!(dotless.validate().is_err());

        let good = Credentials {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_login_response_uses_camel_case() {
        let body = LoginResponse {
            user: PublicUser {
                id: "u".to_string(),
                email: "a@b.com".to_string(),
                name: "a".to_string(),
                role: Role::Admin,
            },
            token: "t".to_string(),
            refresh_token: "r".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["user"]["role"], "admin");
    }
}
