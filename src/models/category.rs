// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Menu category model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Category stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub parent_category: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

fn default_active() -> bool {
    true
}

impl Category {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slugify(&name),
            name,
            description: String::new(),
            is_active: true,
            parent_category: None,
            display_order: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Rename and keep the slug in step.
    pub fn rename(&mut self, name: String) {
        self.slug = slugify(&name);
        self.name = name;
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Lowercase, collapse every non-alphanumeric run into `-`, strip edge dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// By display order, then by name.
pub fn sort_for_display(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}
