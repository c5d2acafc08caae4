// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Maximum length of a display name.
pub const MAX_NAME_LEN: usize = 50;

/// Authorization role carried in access tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// User record stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID v4 (also used as document ID)
    pub id: String,
    /// Normalized email (trimmed, lowercase)
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Build a new user with a fresh ID.
    ///
    /// `email` must already be normalized with [`normalize_email`].
    pub fn new(email: String, password_hash: String, name: String, role: Role) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash,
            name,
            role,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// The client-safe view of this user.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// User fields returned to clients. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose address shape check: `local@domain.tld` with no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some(at) = email.find('@').filter(|&at| at > 0) else {
        return false;
    };
    let domain = &email[at + 1..];
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Default display name for an auto-provisioned account: the email local part.
pub fn default_name_for(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default().trim();
    let name: String = local.chars().take(MAX_NAME_LEN).collect();
    if name.is_empty() {
        "user".to_string()
    } else {
        name
    }
}
