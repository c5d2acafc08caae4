// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-aware HTTP client for the Menuboard API.
//!
//! Session tokens live in the client's cookie store and are never read here.
//! A 401 triggers one coordinated refresh followed by a single replay of the
//! original request.

use super::coordinator::{RefreshCoordinator, RefreshFailed};
use super::error::ClientError;
use crate::error::ErrorResponse;
use crate::models::PublicUser;
use crate::routes::auth::{
    LoginRequest, LoginResponse, LogoutResponse, MeResponse, ProfileUpdate, UserEnvelope,
};
use reqwest::{Method, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ME_PATH: &str = "/api/auth/me";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const PROFILE_PATH: &str = "/api/auth/profile";

/// Called once per failed refresh; the place to send the user back to login.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    refresh_path: String,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()?;

        Ok(ApiClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            refresh_path: self.refresh_path,
            coordinator: RefreshCoordinator::new(),
            on_session_expired: self.on_session_expired,
        })
    }
}

/// API client. Clones share the cookie store and the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    refresh_path: String,
    coordinator: RefreshCoordinator,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            refresh_path: REFRESH_PATH.to_string(),
            on_session_expired: None,
        }
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder(base_url).build()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request against the API; send it with [`ApiClient::execute`].
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, self.url(path))
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send a request, recovering once from an expired session.
    ///
    /// The response to the replay is returned as-is, so a second 401 reaches
    /// the caller unchanged. Requests with streaming bodies cannot be replayed
    /// and are returned after the first attempt.
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let replay = request.try_clone();

        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(replay) = replay else {
            tracing::debug!("401 on a request that cannot be replayed");
            return Ok(response);
        };

        self.recover().await?;
        Ok(self.http.execute(replay).await?)
    }

    async fn recover(&self) -> Result<(), ClientError> {
        self.coordinator
            .refresh(|| async {
                let outcome = self.refresh_session().await;
                if let Err(e) = &outcome {
                    tracing::warn!(error = %e, "Session refresh failed");
                    if let Some(hook) = &self.on_session_expired {
                        hook();
                    }
                }
                outcome
            })
            .await
            .map_err(ClientError::Refresh)
    }

    /// The refresh call itself never goes through recovery.
    async fn refresh_session(&self) -> Result<(), RefreshFailed> {
        tracing::debug!("Refreshing session");
        let response = self
            .http
            .post(self.url(&self.refresh_path))
            .send()
            .await
            .map_err(|e| RefreshFailed::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RefreshFailed::Rejected(response.status().as_u16()))
        }
    }

    // ─── Typed helpers ───────────────────────────────────────

    /// Log in. A 401 here means bad credentials, so there is no recovery.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let response = self
            .request(Method::POST, LOGIN_PATH)
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn logout(&self) -> Result<LogoutResponse, ClientError> {
        let request = self.request(Method::POST, LOGOUT_PATH).build()?;
        decode(self.execute(request).await?).await
    }

    /// The logged-in user, or `None` without a session.
    pub async fn current_user(&self) -> Result<Option<PublicUser>, ClientError> {
        let me: MeResponse = self.get_json(ME_PATH).await?;
        Ok(me.user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<PublicUser, ClientError> {
        let envelope: UserEnvelope = self.send_json(Method::PUT, PROFILE_PATH, update).await?;
        Ok(envelope.user)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.request(Method::GET, path).build()?;
        decode(self.execute(request).await?).await
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path).json(body).build()?;
        decode(self.execute(request).await?).await
    }
}

/// Parse a success body, or turn an error status into [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => (Some(body.code), body.error),
        Err(_) if text.is_empty() => (None, status.to_string()),
        Err(_) => (None, text),
    };

    Err(ClientError::Api {
        status,
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_strips_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(client.url(ME_PATH), "http://127.0.0.1:8080/api/auth/me");
    }
}
