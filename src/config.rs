// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Token secrets are read once at startup and kept in memory.

use std::env;

/// Which credential/catalog store backs the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store; contents are lost on restart.
    Memory,
    /// Google Cloud Firestore in the given project.
    Firestore { project_id: String },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Mark session cookies `Secure` (production over TLS)
    pub secure_cookies: bool,
    /// Unknown emails create an account on first login
    pub allow_auto_register: bool,
    pub storage: StorageBackend,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes); must differ from `jwt_secret`
    pub jwt_refresh_secret: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            secure_cookies: false,
            allow_auto_register: true,
            storage: StorageBackend::Memory,
            jwt_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            jwt_refresh_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "firestore" => StorageBackend::Firestore {
                project_id: env::var("GCP_PROJECT_ID")
                    .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            },
            other => {
                return Err(ConfigError::Invalid(format!(
                    "STORAGE_BACKEND must be 'memory' or 'firestore', got '{}'",
                    other
                )))
            }
        };

        let config = Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            secure_cookies: env::var("APP_ENV")
                .map(|v| v.trim().eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            allow_auto_register: parse_bool("ALLOW_AUTO_REGISTER", true)?,
            storage,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .trim()
                .as_bytes()
                .to_vec(),
            jwt_refresh_secret: env::var("JWT_REFRESH_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_REFRESH_SECRET"))?
                .trim()
                .as_bytes()
                .to_vec(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject secret combinations that break access/refresh separation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET is empty".to_string()));
        }
        if self.jwt_refresh_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "JWT_REFRESH_SECRET is empty".to_string(),
            ));
        }
        if self.jwt_secret == self.jwt_refresh_secret {
            return Err(ConfigError::Invalid(
                "JWT_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid(format!(
                "{} must be a boolean, got '{}'",
                name, other
            ))),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so env mutations never race each other.
    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SECRET", "access_secret_for_tests");
        env::set_var("JWT_REFRESH_SECRET", "refresh_secret_for_tests");
        env::set_var("APP_ENV", "production");
        env::set_var("ALLOW_AUTO_REGISTER", "false");
        env::remove_var("STORAGE_BACKEND");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_secret, b"access_secret_for_tests");
        assert_eq!(config.jwt_refresh_secret, b"refresh_secret_for_tests");
        assert!(config.secure_cookies);
        assert!(!config.allow_auto_register);
        assert_eq!(config.storage, StorageBackend::Memory);

        env::set_var("JWT_REFRESH_SECRET", "access_secret_for_tests");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));

        env::set_var("JWT_REFRESH_SECRET", "refresh_secret_for_tests");
        env::set_var("STORAGE_BACKEND", "postgres");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));

        env::remove_var("STORAGE_BACKEND");
        env::remove_var("APP_ENV");
        env::remove_var("ALLOW_AUTO_REGISTER");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::test_default().validate().is_ok());
    }
}
