//! Common types shared across Pressbox crates.
//!
//! This crate holds the workspace error type and the logging initialiser. It
//! stays small so every other crate can depend on it.
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`PressboxError`] and [`Result`]: shared error handling
//!
//! ```rust
//! use pressbox_common::PressboxError;
//!
//! let err = PressboxError::Config("no accounts configured".into());
//! assert_eq!(err.to_string(), "Configuration error: no accounts configured");
//! ```

pub mod observability;

/// Error types used across the Pressbox system.
#[derive(thiserror::Error, Debug)]
pub enum PressboxError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The checkpoint file could not be read or written.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

/// Convenient alias for results that use [`PressboxError`].
pub type Result<T> = std::result::Result<T, PressboxError>;
