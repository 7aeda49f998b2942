//! Authorization Gate
//! Mission: Admit a validated identity only to operations declared for its role

use crate::auth::{middleware::extract_claims, models::Role};
use crate::errors::AppError;
use axum::{extract::Request, middleware::Next, response::Response};

/// Exact role match. There is no hierarchy, and a missing role never passes.
pub fn allows(presented: Option<Role>, required: Role) -> bool {
    presented == Some(required)
}

fn check(req: &Request, required: Role, denied: &str) -> Result<(), AppError> {
    // Runs after auth_middleware; no claims means the request was never authenticated
    let claims = extract_claims(req)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    if allows(Some(claims.role), required) {
        Ok(())
    } else {
        Err(AppError::Forbidden(denied.to_string()))
    }
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    check(&req, Role::Admin, "Forbidden: Admin access required")?;
    Ok(next.run(req).await)
}

pub async fn require_user(req: Request, next: Next) -> Result<Response, AppError> {
    check(&req, Role::User, "Forbidden: User access required")?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Claims;
    use axum::body::Body;

    fn request_with(role: Option<Role>) -> Request {
        let mut req = Request::new(Body::empty());
        if let Some(role) = role {
            req.extensions_mut().insert(Claims {
                sub: 1,
                username: "alice".to_string(),
                role,
                iat: 0,
                exp: i64::MAX,
            });
        }
        req
    }

    #[test]
    fn test_exact_match_only() {
        assert!(allows(Some(Role::Admin), Role::Admin));
        assert!(allows(Some(Role::User), Role::User));
        assert!(!allows(Some(Role::User), Role::Admin));
        assert!(!allows(Some(Role::Admin), Role::User));
    }

    #[test]
    fn test_missing_role_denied() {
        for required in Role::ALL {
            assert!(!allows(None, required));
        }
    }

    #[test]
    fn test_check_maps_failures() {
        assert!(check(&request_with(Some(Role::Admin)), Role::Admin, "no").is_ok());
        assert!(matches!(
            check(&request_with(Some(Role::User)), Role::Admin, "no"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check(&request_with(None), Role::Admin, "no"),
            Err(AppError::Auth(_))
        ));
    }
}
