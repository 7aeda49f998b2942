//! Router assembly shared by the binary and the HTTP tests.

use crate::auth::{api as auth_api, auth_middleware, gate, AuthService};
use crate::errors::AppError;
use crate::middleware::request_logging;
use crate::response::ApiResponse;
use crate::users::{api as users_api, UserService};
use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

async fn index() -> ApiResponse<Value> {
    ApiResponse::ok(
        "UserHub API",
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

async fn health_check() -> ApiResponse<Value> {
    ApiResponse::ok("OK", json!({ "status": "healthy" }))
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn create_router(state: AppState) -> Router {
    let authenticated = middleware::from_fn_with_state(state.auth.clone(), auth_middleware);

    let public_routes = Router::<AppState>::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login));

    let session_routes = Router::<AppState>::new()
        .route("/auth/logout", post(auth_api::logout))
        .route("/auth/me", get(auth_api::me))
        .route_layer(authenticated.clone());

    // Layers run bottom-up: authenticate, then check the role
    let admin_routes = Router::<AppState>::new()
        .route("/admin/dashboard", get(users_api::admin_dashboard))
        .route("/admin/user", get(users_api::list_users))
        .route("/admin/user/deleted", get(users_api::list_deleted_users))
        .route("/admin/user/create", post(users_api::create_user))
        .route(
            "/admin/user/:id",
            get(users_api::get_user).delete(users_api::delete_user),
        )
        .route("/admin/user/update/:id", put(users_api::update_user))
        .route(
            "/admin/user/permanent/:id",
            delete(users_api::hard_delete_user),
        )
        .route("/admin/user/restore/:id", post(users_api::restore_user))
        .route_layer(middleware::from_fn(gate::require_admin))
        .route_layer(authenticated.clone());

    let user_routes = Router::<AppState>::new()
        .route("/user/dashboard", get(users_api::user_dashboard))
        .route("/user/profile", get(users_api::get_profile))
        .route("/user/profile/update", put(users_api::update_profile))
        .route_layer(middleware::from_fn(gate::require_user))
        .route_layer(authenticated);

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .merge(user_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
