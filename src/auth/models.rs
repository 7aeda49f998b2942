//! Authentication Models
//! Mission: Define roles, token claims and auth request payloads

use crate::users::models::UserResponse;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Exact, case-sensitive match against the wire names
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64, // subject (user id)
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Public registration body. A `role` field, if sent, is ignored.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64, // seconds until expiration
    pub user: UserResponse,
}

/// Identity carried by a validated token, as returned by /auth/me
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub expires_at: i64,
}

impl From<&Claims> for IdentityResponse {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username.clone(),
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}
