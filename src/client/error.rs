// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side error type.

use super::coordinator::RefreshFailed;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No usable response (timeout, connection refused, bad body).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("{status}: {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    /// The session could not be renewed; the user has to log in again.
    #[error("Session expired: {0}")]
    Refresh(#[from] RefreshFailed),
}

impl ClientError {
    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            ClientError::Refresh(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(e) if e.is_timeout())
    }
}
