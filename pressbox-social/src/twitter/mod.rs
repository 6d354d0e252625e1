//! Twitter/X API integration.
//!
//! `client` wraps the shared HTTP client with the endpoints Pressbox needs;
//! `types` holds the response models.
pub mod client;
pub mod types;

pub use client::{TimelineQuery, TwitterApi, status_url};
