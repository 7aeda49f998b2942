//! Authentication API Endpoints
//! Mission: Provide register, login, logout and identity endpoints

use crate::auth::{
    middleware::BearerToken,
    models::{Claims, IdentityResponse, LoginRequest, LoginResponse, RegisterRequest},
    service::AuthService,
};
use crate::errors::{blocking, AppError};
use crate::response::ApiResponse;
use crate::users::models::UserResponse;
use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use std::sync::Arc;

/// Register endpoint - POST /auth/register
pub async fn register(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let Json(req) = payload?;
    let user = blocking(move || auth.register(&req)).await?;

    Ok(ApiResponse::created(
        "User registered successfully",
        UserResponse::from_user(&user),
    ))
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(auth): State<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let Json(req) = payload?;
    let (issued, user) = blocking(move || auth.login(&req)).await?;

    Ok(ApiResponse::ok(
        "Login successful",
        LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
            user: UserResponse::from_user(&user),
        },
    ))
}

/// Logout endpoint - POST /auth/logout (behind auth middleware)
pub async fn logout(
    State(auth): State<Arc<AuthService>>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<ApiResponse<()>, AppError> {
    blocking(move || auth.logout(&token, &claims)).await?;
    Ok(ApiResponse::message(
        "Logout successful. Token has been revoked.",
    ))
}

/// Current identity - GET /auth/me (behind auth middleware)
pub async fn me(Extension(claims): Extension<Claims>) -> ApiResponse<IdentityResponse> {
    ApiResponse::ok("Authenticated", IdentityResponse::from(&claims))
}
