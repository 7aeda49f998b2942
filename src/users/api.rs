//! User API Endpoints
//! Mission: Admin account management and self-service profile routes

use crate::auth::models::{Claims, IdentityResponse};
use crate::errors::{blocking, AppError};
use crate::response::{ApiResponse, PaginatedResponse};
use crate::users::{
    models::{CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, User, UserResponse},
    query::ListUserQuery,
    service::UserService,
};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;

fn responses(users: &[User]) -> Vec<UserResponse> {
    users.iter().map(UserResponse::from_user).collect()
}

/// GET /admin/dashboard
pub async fn admin_dashboard(Extension(claims): Extension<Claims>) -> ApiResponse<IdentityResponse> {
    ApiResponse::ok("Welcome to the admin dashboard", IdentityResponse::from(&claims))
}

/// GET /user/dashboard
pub async fn user_dashboard(Extension(claims): Extension<Claims>) -> ApiResponse<IdentityResponse> {
    ApiResponse::ok("Welcome to the user dashboard", IdentityResponse::from(&claims))
}

/// GET /admin/user
pub async fn list_users(
    State(users): State<Arc<UserService>>,
    query: Result<Query<ListUserQuery>, QueryRejection>,
) -> Result<PaginatedResponse<Vec<UserResponse>>, AppError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let (found, pagination) = blocking(move || users.list_users(&filter)).await?;

    Ok(PaginatedResponse::new(
        "Users retrieved successfully",
        responses(&found),
        pagination,
    ))
}

/// GET /admin/user/deleted
pub async fn list_deleted_users(
    State(users): State<Arc<UserService>>,
    query: Result<Query<ListUserQuery>, QueryRejection>,
) -> Result<PaginatedResponse<Vec<UserResponse>>, AppError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let (found, pagination) = blocking(move || users.list_deleted_users(&filter)).await?;

    Ok(PaginatedResponse::new(
        "Deleted users retrieved successfully",
        responses(&found),
        pagination,
    ))
}

/// POST /admin/user/create
pub async fn create_user(
    State(users): State<Arc<UserService>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let Json(req) = payload?;
    let user = blocking(move || users.create_user(&req)).await?;

    Ok(ApiResponse::created(
        "User created successfully",
        UserResponse::from_user(&user),
    ))
}

/// GET /admin/user/:id
pub async fn get_user(
    State(users): State<Arc<UserService>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let Path(id) = id?;
    let user = blocking(move || users.get_user_by_id(id)).await?;

    Ok(ApiResponse::ok(
        "User retrieved successfully",
        UserResponse::from_user(&user),
    ))
}

/// PUT /admin/user/update/:id
pub async fn update_user(
    State(users): State<Arc<UserService>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let user = blocking(move || users.update_user(id, &req)).await?;

    Ok(ApiResponse::ok(
        "User updated successfully",
        UserResponse::from_user(&user),
    ))
}

/// DELETE /admin/user/:id (soft delete)
pub async fn delete_user(
    State(users): State<Arc<UserService>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    blocking(move || users.delete_user(id, claims.sub)).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

/// DELETE /admin/user/permanent/:id
pub async fn hard_delete_user(
    State(users): State<Arc<UserService>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    blocking(move || users.hard_delete_user(id, claims.sub)).await?;
    Ok(ApiResponse::message("User permanently deleted"))
}

/// POST /admin/user/restore/:id
pub async fn restore_user(
    State(users): State<Arc<UserService>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    blocking(move || users.restore_user(id)).await?;
    Ok(ApiResponse::message("User restored successfully"))
}

/// GET /user/profile
pub async fn get_profile(
    State(users): State<Arc<UserService>>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = blocking(move || users.get_profile(claims.sub)).await?;

    Ok(ApiResponse::ok(
        "Profile retrieved successfully",
        UserResponse::from_user(&user),
    ))
}

/// PUT /user/profile/update
pub async fn update_profile(
    State(users): State<Arc<UserService>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let Json(req) = payload?;
    let user = blocking(move || users.update_profile(claims.sub, &req)).await?;

    Ok(ApiResponse::ok(
        "Profile updated successfully",
        UserResponse::from_user(&user),
    ))
}
