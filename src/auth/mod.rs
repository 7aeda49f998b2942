//! Authentication Module
//! Mission: Secure API access with JWT tokens, revocation and role checks

pub mod api;
pub mod blacklist;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use blacklist::{SqliteTokenBlacklist, TokenBlacklist};
pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use service::AuthService;
