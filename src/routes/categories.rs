// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Category routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::category::sort_for_display;
use crate::models::{Category, ProductFilter};
use crate::AppState;

/// Public listing.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/categories", get(list_categories))
}

/// Management routes. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/categories", post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[serde(default)]
    #[validate(length(max = 50, message = "Category name cannot exceed 50 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub parent_category: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

impl CategoryInput {
    fn trimmed_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    fn apply(self, category: &mut Category) {
        if let Some(name) = self.trimmed_name() {
            category.rename(name);
        }
        if let Some(description) = self.description {
            category.description = description.trim().to_string();
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
        if let Some(parent) = self.parent_category {
            category.parent_category = Some(parent).filter(|p| !p.is_empty());
        }
        if let Some(order) = self.display_order {
            category.display_order = order;
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn category_not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}

/// Name must be unique across categories other than `except_id`.
async fn ensure_name_available(
    state: &AppState,
    name: &str,
    except_id: Option<&str>,
) -> Result<()> {
    match state.db.find_category_by_name(name).await? {
        Some(existing) if Some(existing.id.as_str()) != except_id => {
            Err(AppError::BadRequest("Category already exists".to_string()))
        }
        _ => Ok(()),
    }
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Category>>> {
    let mut categories: Vec<Category> = state
        .db
        .list_categories()
        .await?
        .into_iter()
        .filter(|c| c.is_active)
        .collect();
    sort_for_display(&mut categories);
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CategoryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>)> {
    let Json(input) = payload?;
    input.validate()?;

    let name = input
        .trimmed_name()
        .ok_or_else(|| AppError::Validation("Category name is required".to_string()))?;
    ensure_name_available(&state, &name, None).await?;

    let mut category = Category::new(name);
    input.apply(&mut category);
    state.db.upsert_category(&category).await?;

    tracing::info!(category_id = %category.id, name = %category.name, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CategoryDetail>> {
    let category = state
        .db
        .get_category(&id)
        .await?
        .ok_or_else(category_not_found)?;

    let product_count = state
        .db
        .list_products(&ProductFilter {
            category: Some(id),
            active_only: true,
            ..Default::default()
        })
        .await?
        .len();

    Ok(Json(CategoryDetail {
        category,
        product_count,
    }))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<Category>> {
    let Json(input) = payload?;
    input.validate()?;

    let mut category = state
        .db
        .get_category(&id)
        .await?
        .ok_or_else(category_not_found)?;

    if let Some(name) = input.trimmed_name() {
        ensure_name_available(&state, &name, Some(&id)).await?;
    }

    input.apply(&mut category);
    category.touch();
    state.db.upsert_category(&category).await?;

    Ok(Json(category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if state.db.get_category(&id).await?.is_none() {
        return Err(category_not_found());
    }

    let in_use = !state
        .db
        .list_products(&ProductFilter {
            category: Some(id.clone()),
            ..Default::default()
        })
        .await?
        .is_empty();
    if in_use {
        return Err(AppError::BadRequest(
            "Cannot delete category with existing products".to_string(),
        ));
    }

    state.db.delete_category(&id).await?;
    tracing::info!(category_id = %id, "Category deleted");

    Ok(Json(MessageResponse {
        message: "Category deleted successfully".to_string(),
    }))
}
