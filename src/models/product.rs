// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Menu product model and listing filter.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Product stored in the catalog. `category` holds the category ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub calories: String,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub sku: String,
    pub created_at: String,
    pub updated_at: String,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn new(name: String, description: String, price: f64, category: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            price: round_price(price),
            calories: String::new(),
            category,
            image: String::new(),
            is_active: true,
            sku: generate_sku(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Attach the product view of its category.
    pub fn with_category(self, category: Option<CategoryRef>) -> ProductView {
        ProductView {
            category: category.unwrap_or_else(|| CategoryRef {
                id: self.category.clone(),
                name: String::new(),
            }),
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            calories: self.calories,
            image: self.image,
            is_active: self.is_active,
            sku: self.sku,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Minimal category reference embedded in product responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

/// Product as returned by the API, with its category populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub calories: String,
    pub category: CategoryRef,
    pub image: String,
    pub is_active: bool,
    pub sku: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing filter shared by the admin product list and the public menu.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub active_only: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if self.active_only && !product.is_active {
            return false;
        }
        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Newest first.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Bare file names are served from `/uploads/`; paths and URLs pass through.
pub fn normalize_image_ref(image: &str) -> String {
    let image = image.trim();
    if image.is_empty() || image.starts_with("http") || image.starts_with('/') {
        image.to_string()
    } else {
        format!("/uploads/{}", image)
    }
}

fn generate_sku() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("PROD-{}", id[..8].to_uppercase())
}
