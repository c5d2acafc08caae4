// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Product routes and the public menu.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use super::categories::MessageResponse;
use crate::error::{AppError, Result};
use crate::models::product::{normalize_image_ref, round_price, sort_newest_first};
use crate::models::{CategoryRef, Product, ProductFilter, ProductView};
use crate::AppState;

/// Public menu of active products.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/menu", get(get_menu))
}

/// Management routes. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ProductQuery {
    fn into_filter(self, active_only: bool) -> ProductFilter {
        ProductFilter {
            category: self.category.filter(|c| !c.is_empty()),
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            active_only,
        }
    }
}

/// Create/update body; every field is optional so PUT can be partial.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    #[validate(length(max = 100, message = "Product name cannot exceed 100 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[serde(default)]
    pub calories: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ProductInput {
    fn apply(self, product: &mut Product) {
        if let Some(name) = non_blank(&self.name) {
            product.name = name;
        }
        if let Some(description) = non_blank(&self.description) {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = round_price(price);
        }
        if let Some(calories) = self.calories {
            product.calories = calories.trim().to_string();
        }
        if let Some(category) = non_blank(&self.category) {
            product.category = category;
        }
        if let Some(image) = self.image {
            product.image = normalize_image_ref(&image);
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
    }
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

async fn require_category(state: &AppState, id: &str) -> Result<CategoryRef> {
    state
        .db
        .get_category(id)
        .await?
        .map(|c| CategoryRef { id: c.id, name: c.name })
        .ok_or_else(|| AppError::BadRequest("Category not found".to_string()))
}

/// Sorted, category-populated listing.
async fn product_views(state: &AppState, filter: ProductFilter) -> Result<Vec<ProductView>> {
    let mut products = state.db.list_products(&filter).await?;
    sort_newest_first(&mut products);

    let categories: HashMap<String, CategoryRef> = state
        .db
        .list_categories()
        .await?
        .into_iter()
        .map(|c| {
            (
                c.id.clone(),
                CategoryRef {
                    id: c.id,
                    name: c.name,
                },
            )
        })
        .collect();

    Ok(products
        .into_iter()
        .map(|p| {
            let category = categories.get(&p.category).cloned();
            p.with_category(category)
        })
        .collect())
}

async fn view(state: &AppState, product: Product) -> Result<ProductView> {
    let category = state
        .db
        .get_category(&product.category)
        .await?
        .map(|c| CategoryRef { id: c.id, name: c.name });
    Ok(product.with_category(category))
}

async fn get_menu(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>> {
    Ok(Json(product_views(&state, query.into_filter(true)).await?))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>> {
    Ok(Json(product_views(&state, query.into_filter(false)).await?))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let Json(input) = payload?;
    input.validate()?;

    let (Some(name), Some(description), Some(price), Some(category)) = (
        non_blank(&input.name),
        non_blank(&input.description),
        input.price,
        non_blank(&input.category),
    ) else {
        return Err(AppError::Validation(
            "Name, description, price and category are required".to_string(),
        ));
    };

    let category_ref = require_category(&state, &category).await?;

    let mut product = Product::new(name, description, price, category);
    input.apply(&mut product);
    state.db.upsert_product(&product).await?;

    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(product.with_category(Some(category_ref))),
    ))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let product = state
        .db
        .get_product(&id)
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(view(&state, product).await?))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ProductView>> {
    let Json(input) = payload?;
    input.validate()?;

    let mut product = state
        .db
        .get_product(&id)
        .await?
        .ok_or_else(product_not_found)?;

    if let Some(category) = non_blank(&input.category) {
        if category != product.category {
            require_category(&state, &category).await?;
        }
    }

    input.apply(&mut product);
    product.touch();
    state.db.upsert_product(&product).await?;

    Ok(Json(view(&state, product).await?))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_product(&id).await? {
        return Err(product_not_found());
    }
    tracing::info!(product_id = %id, "Product deleted");

    Ok(Json(MessageResponse {
        message: "Product deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_blank_values_ignored() {
        let filter = ProductQuery {
            category: Some(String::new()),
            search: Some("  ".to_string()),
        }
        .into_filter(true);
        assert!(filter.category.is_none());
        assert!(filter.search.is_none());
        assert!(filter.active_only);
    }

    #[test]
    fn test_negative_price_rejected() {
        let input = ProductInput {
            price: Some(-1.0),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_apply_is_partial() {
        let mut product = Product::new(
            "Soup".to_string(),
            "Hot".to_string(),
            5.0,
            "c1".to_string(),
        );
        ProductInput {
            price: Some(6.499),
            image: Some("soup.jpg".to_string()),
            ..Default::default()
        }
        .apply(&mut product);

        assert_eq!(product.name, "Soup");
        assert_eq!(product.price, 6.5);
        assert_eq!(product.image, "/uploads/soup.jpg");
    }
}
