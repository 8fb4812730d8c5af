// Social Hub - data layer for a small social network
// Posts, follows, likes/shares/saves, comments, direct messages and notifications

// Core helpers - time labels and display formatting
pub mod core;

// Storage, sessions, ids and request plumbing
pub mod infrastructure;

// Rows, read models and view types
pub mod models;

// Business operations over the store
pub mod services;

// Client-side feed state and controller
pub mod presentation;

// HTTP surface and the façade it wraps
pub mod social_interface;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use social_interface::{create_social_router, SocialInterface};
