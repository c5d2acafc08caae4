// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the store traits on top of:
//! - `users` (profile + password hash, keyed by user ID)
//! - `user_emails` (email reservations for uniqueness)
//! - `revoked_refresh_tokens` (single-use refresh token bookkeeping)
//! - `categories` / `products` (menu catalog)
//!
//! Uniqueness relies on create-only inserts: Firestore rejects an insert
//! whose document already exists, which we surface as a conflict.

use super::{collections, CatalogStore, RevocationStore, UserStore};
use crate::error::AppError;
use crate::models::{Category, Product, ProductFilter, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};

/// Email reservation document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailReservation {
    user_id: String,
}

/// Revocation document. `expires_at` is a Firestore timestamp so a TTL
/// policy on that field can delete the record once the token is dead.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RevokedRefreshToken {
    user_id: String,
    jti: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    expires_at: DateTime<Utc>,
    revoked_at: String,
}

/// Firestore-backed store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_doc<T>(&self, collection: &str, id: &str, value: &T) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Sync + Send,
    {
        let _: T = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(value)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create-only insert. `Ok(false)` if the document already exists.
    async fn insert_doc<T>(&self, collection: &str, id: &str, value: &T) -> Result<bool, AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Sync + Send,
    {
        let result: Result<T, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(value)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Returns `false` if the document did not exist.
    async fn delete_doc<T>(&self, collection: &str, id: &str) -> Result<bool, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        if self.get_doc::<T>(collection, id).await?.is_none() {
            return Ok(false);
        }
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }
}

/// Emails may contain `/`, which Firestore does not allow in document IDs.
fn email_doc_id(email: &str) -> String {
    urlencoding::encode(email).into_owned()
}

fn revocation_doc_id(user_id: &str, jti: &str) -> String {
    format!("{}_{}", user_id, jti)
}

/// Token `exp` (Unix seconds) as a timestamp for the TTL field.
fn expiry_timestamp(exp: u64) -> Result<DateTime<Utc>, AppError> {
    i64::try_from(exp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Token expiry out of range: {}", exp)))
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserStore for FirestoreStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let reservation: Option<EmailReservation> = self
            .get_doc(collections::USER_EMAILS, &email_doc_id(email))
            .await?;

        match reservation {
            Some(r) => self.get_user(&r.user_id).await,
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let reservation = EmailReservation {
            user_id: user.id.clone(),
        };

        let reserved = self
            .insert_doc(
                collections::USER_EMAILS,
                &email_doc_id(&user.email),
                &reservation,
            )
            .await?;
        if !reserved {
            return Err(AppError::DuplicateEmail);
        }

        if let Err(e) = self.put_doc(collections::USERS, &user.id, user).await {
            // Release the reservation so the email is not locked out forever.
            let reservation_id = email_doc_id(&user.email);
            if let Err(cleanup) = self
                .delete_doc::<EmailReservation>(collections::USER_EMAILS, &reservation_id)
                .await
            {
                tracing::error!(error = %cleanup, "Failed to release email reservation");
            }
            return Err(e);
        }

        tracing::debug!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let existing = self.get_user(&user.id).await?.ok_or(AppError::UserNotFound)?;
        if existing.email != user.email {
            return Err(AppError::BadRequest("Email cannot be changed".to_string()));
        }
        self.put_doc(collections::USERS, &user.id, user).await
    }
}

// ─── Refresh Token Revocation ────────────────────────────────

#[async_trait]
impl RevocationStore for FirestoreStore {
    async fn consume_refresh_token(
        &self,
        user_id: &str,
        jti: &str,
        expires_at: u64,
    ) -> Result<bool, AppError> {
        let record = RevokedRefreshToken {
            user_id: user_id.to_string(),
            jti: jti.to_string(),
            expires_at: expiry_timestamp(expires_at)?,
            revoked_at: chrono::Utc::now().to_rfc3339(),
        };

        self.insert_doc(
            collections::REVOKED_REFRESH_TOKENS,
            &revocation_doc_id(user_id, jti),
            &record,
        )
        .await
    }
}

// ─── Catalog Operations ──────────────────────────────────────

#[async_trait]
impl CatalogStore for FirestoreStore {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::CATEGORIES)
            .obj::<Category>()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        self.get_doc(collections::CATEGORIES, id).await
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, AppError> {
        let name = name.to_string();
        let matches: Vec<Category> = self
            .client
            .fluent()
            .select()
            .from(collections::CATEGORIES)
            .filter(move |q| q.field("name").eq(name.clone()))
            .limit(1)
            .obj::<Category>()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(matches.into_iter().next())
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), AppError> {
        self.put_doc(collections::CATEGORIES, &category.id, category)
            .await
    }

    async fn delete_category(&self, id: &str) -> Result<bool, AppError> {
        self.delete_doc::<Category>(collections::CATEGORIES, id)
            .await
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let query = self
            .client
            .fluent()
            .select()
            .from(collections::PRODUCTS);

        // Category is pushed down to Firestore; text search has no index
        // equivalent and is applied here.
        let products: Vec<Product> = match filter.category.clone() {
            Some(category) => query
                .filter(move |q| q.field("category").eq(category.clone()))
                .obj::<Product>()
                .query()
                .await,
            None => query.obj::<Product>().query().await,
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(products.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        self.get_doc(collections::PRODUCTS, id).await
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), AppError> {
        self.put_doc(collections::PRODUCTS, &product.id, product)
            .await
    }

    async fn delete_product(&self, id: &str) -> Result<bool, AppError> {
        self.delete_doc::<Product>(collections::PRODUCTS, id)
            .await
    }
}
