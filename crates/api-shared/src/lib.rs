//! # API Shared
//!
//! Shared utilities and definitions for the Aether APIs.
//!
//! Contains:
//! - Response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by the REST binary; the CLI prints core types directly.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
