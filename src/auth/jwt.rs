//! JWT Token Handler
//! Mission: Mint HMAC-signed session tokens and verify them strictly

use crate::auth::models::Claims;
use crate::users::models::User;
use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// A freshly signed token and its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
    pub expires_in: i64,
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_hours: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: &str, expiration_hours: i64) -> Self {
        // Only the HMAC family is accepted; a token advertising any other
        // algorithm is rejected before its signature is looked at.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiration_hours,
        }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &User) -> Result<IssuedToken> {
        let now = Utc::now();
        let lifetime = Duration::try_hours(self.expiration_hours)
            .context("Token lifetime out of range")?;
        let expiration = now
            .checked_add_signed(lifetime)
            .context("Invalid timestamp")?;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        debug!(
            "Generating JWT for user {} ({}), expires in {}h",
            user.username, user.id, self.expiration_hours
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to generate JWT")?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
            expires_in: claims.exp - claims.iat,
        })
    }

    /// Verify signature, algorithm and expiry, then decode the typed claims.
    ///
    /// Does not consult the blacklist; see `AuthService::validate_token`.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .context("Invalid or expired token")?;

        // A token is dead from the second of its exp onwards, matching the blacklist
        if decoded.claims.exp <= Utc::now().timestamp() {
            bail!("Token expired at {}", decoded.claims.exp);
        }

        debug!("Validated JWT for user {}", decoded.claims.username);

        Ok(decoded.claims)
    }
}
