//! Authentication module for the admin login session and access control.
//!
//! This module provides the public interface for the session lifecycle
//! (login, validity checks with sliding refresh, logout), the page guard,
//! and the command handlers that drive them.

pub mod routes;
pub mod handlers;
pub mod models;
pub mod middleware;
pub mod service;
pub mod errors;

// Re-exports for convenience
pub use models::*;
pub use middleware::*;
pub use routes::*;
pub use service::*;
pub use errors::*;
