//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation

use crate::auth::{models::Claims, service::AuthService};
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// The raw token that authenticated this request, kept for logout
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Id of the caller, attached to the response so outer layers can log it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

/// Pull the token out of `Authorization: Bearer <token>`.
/// An empty token is passed through and fails validation like any bad token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let invalid = || AppError::Auth("Invalid authorization header format".to_string());

    let value = value.to_str().map_err(|_| invalid())?;
    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.contains(' ') => Ok(token),
        _ => Err(invalid()),
    }
}

/// Auth middleware that validates JWT tokens
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?.to_string();

    // Signature, algorithm and expiry first, then the blacklist
    let claims = auth.validate_token(&token)?;
    let user = AuthenticatedUser(claims.sub);

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(BearerToken(token));

    let mut response = next.run(req).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}
