// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod category;
pub mod product;
pub mod user;

pub use category::Category;
pub use product::{CategoryRef, Product, ProductFilter, ProductView};
pub use user::{PublicUser, Role, User};
