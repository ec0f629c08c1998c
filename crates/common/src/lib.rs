//! Shelter Common Library
//!
//! Shared code for the shelter operations service including:
//! - Database models, the persistence port and its implementations
//! - Typed forms and validation
//! - Status state machines for applications and tasks
//! - Business services and form-action results
//! - Error types and handling
//! - Configuration management
//! - Session authentication and role gates
//! - View cache, image storage, metrics

pub mod actions;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod forms;
pub mod metrics;
pub mod services;
pub mod storage;
pub mod workflow;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, ShelterStore};
pub use errors::{AppError, Result};
pub use services::Services;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
