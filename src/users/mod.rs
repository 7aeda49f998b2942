//! User Module
//! Mission: Store accounts and expose admin and self-service management

pub mod api;
pub mod models;
pub mod query;
pub mod service;
pub mod store;

pub use service::UserService;
pub use store::{SqliteUserStore, UserRepository};
