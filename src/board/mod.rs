//! Board posts.
//!
//! This module provides:
//! - Post, page and category models
//! - The posts client (list, view, create, edit, delete)
//! - Category labels with built-in fallbacks

mod client;
mod types;

pub use client::{PostsApi, BOARDS_PATH};
pub use types::{Category, Post, PostPage, PostRequest};
