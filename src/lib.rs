//! UserHub Backend Library
//!
//! User management REST backend: JWT sessions with revocation, role-gated
//! admin routes and soft-deletable accounts. Exposes every module so the
//! binary and the HTTP tests assemble the same router.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod users;
pub mod validation;

pub use config::Config;
pub use errors::AppError;
pub use routes::{create_router, AppState};
