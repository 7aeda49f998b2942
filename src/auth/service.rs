//! Authentication Service
//! Mission: Register accounts, exchange credentials for tokens, revoke tokens

use crate::auth::{
    blacklist::TokenBlacklist,
    jwt::{IssuedToken, JwtHandler},
    models::{Claims, LoginRequest, RegisterRequest, Role},
    password::PasswordHasher,
};
use crate::errors::AppError;
use crate::users::models::{NewUser, User};
use crate::users::service::ensure_unique;
use crate::users::store::UserRepository;
use crate::validation::FieldChecks;
use anyhow::anyhow;
use chrono::DateTime;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const REVOKED_TOKEN: &str = "Token has been revoked. Please login again.";

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    blacklist: Arc<dyn TokenBlacklist>,
    jwt: JwtHandler,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        blacklist: Arc<dyn TokenBlacklist>,
        jwt: JwtHandler,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            blacklist,
            jwt,
            hasher,
        }
    }

    /// Public sign-up; always creates a `user`-role account
    pub fn register(&self, req: &RegisterRequest) -> Result<User, AppError> {
        FieldChecks::new()
            .username(&req.username, true)
            .email(&req.email, true)
            .phone(&req.phone, true)
            .password(&req.password, &req.confirm_password)
            .finish()?;

        ensure_unique(
            self.users.as_ref(),
            Some(&req.username),
            Some(&req.email),
            Some(&req.phone),
        )?;

        let password_hash = self.hasher.hash(&req.password)?;

        let user = self
            .users
            .create(&NewUser {
                username: req.username.clone(),
                email: req.email.clone(),
                phone: req.phone.clone(),
                password_hash,
                role: Role::User,
            })
            .map_err(AppError::from_store)?;

        info!("Registered user: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Unknown username and wrong password fail identically
    pub fn login(&self, req: &LoginRequest) -> Result<(IssuedToken, User), AppError> {
        FieldChecks::new()
            .required("username", &req.username)
            .required("password", &req.password)
            .finish()?;

        let user = self
            .users
            .find_by_username(&req.username)
            .map_err(AppError::Internal)?;

        let valid = match &user {
            Some(user) => self.hasher.verify(&req.password, &user.password_hash)?,
            None => self.hasher.verify_decoy(&req.password),
        };

        let user = match user {
            Some(user) if valid => user,
            _ => {
                warn!("Failed login attempt: {}", req.username);
                return Err(AppError::invalid_credentials());
            }
        };

        let issued = self.jwt.generate_token(&user)?;

        info!(
            "Login successful: {} ({})",
            user.username,
            user.role.as_str()
        );

        Ok((issued, user))
    }

    /// Full token check: signature, algorithm, expiry, claim shape, then blacklist
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.jwt.validate_token(token).map_err(|e| {
            debug!("Token rejected: {:#}", e);
            AppError::Auth(INVALID_TOKEN.to_string())
        })?;

        if self.blacklist.is_blacklisted(token)? {
            warn!("Revoked token presented for user {}", claims.sub);
            return Err(AppError::Auth(REVOKED_TOKEN.to_string()));
        }

        Ok(claims)
    }

    /// Revoke exactly this token; other sessions of the same user stay valid
    pub fn logout(&self, token: &str, identity: &Claims) -> Result<(), AppError> {
        let claims = self
            .jwt
            .validate_token(token)
            .map_err(|_| AppError::Auth(INVALID_TOKEN.to_string()))?;

        if claims.sub != identity.sub {
            return Err(AppError::Auth(INVALID_TOKEN.to_string()));
        }

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| anyhow!("Token expiry {} out of range", claims.exp))?;

        self.blacklist.add(token, claims.sub, expires_at)?;

        info!("Logged out user {} ({})", claims.username, claims.sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::blacklist::{MemoryTokenBlacklist, SqliteTokenBlacklist};
    use crate::users::store::SqliteUserStore;
    use std::sync::Barrier;
    use tempfile::NamedTempFile;

    const SECRET: &str = "service-test-secret-service-test-secret";

    fn create_test_service() -> (AuthService, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let service = AuthService::new(
            Arc::new(SqliteUserStore::new(db_path).unwrap()),
            Arc::new(SqliteTokenBlacklist::new(db_path).unwrap()),
            JwtHandler::new(SECRET, 24),
            PasswordHasher::new(4).unwrap(),
        );
        (service, temp_file)
    }

    fn register_req(username: &str, email: &str, phone: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password: "password123".to_string(),
            confirm_password: "password123".to_string(),
        }
    }

    fn login_req(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_defaults_to_user_role() {
        let (service, _temp) = create_test_service();
        let user = service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();

        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[test]
    fn test_register_conflicts_in_field_order() {
        let (service, _temp) = create_test_service();
        service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();

        let conflict = |req: RegisterRequest| match service.register(&req) {
            Err(AppError::Conflict(msg)) => msg,
            other => panic!("expected conflict, got {other:?}"),
        };

        // Everything collides: username is reported first
        assert_eq!(
            conflict(register_req("alice", "alice@x.com", "080000000")),
            "username already exists"
        );
        assert_eq!(
            conflict(register_req("alice2", "alice@x.com", "080000000")),
            "email already exists"
        );
        assert_eq!(
            conflict(register_req("alice3", "alice3@x.com", "080000000")),
            "phone already exists"
        );
    }

    #[test]
    fn test_register_rejects_bad_fields() {
        let (service, _temp) = create_test_service();
        let mut req = register_req("al", "nope", "12");
        req.confirm_password = "mismatch".to_string();

        match service.register(&req) {
            Err(AppError::Validation { fields, .. }) => {
                assert!(fields.contains_key("username"));
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("phone"));
                assert!(fields.contains_key("confirm_password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_login_issues_token_matching_user() {
        let (service, _temp) = create_test_service();
        let user = service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();

        let (issued, logged_in) = service
            .login(&login_req("alice", "password123"))
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let claims = service.validate_token(&issued.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let (service, _temp) = create_test_service();
        service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();

        let wrong_password = service
            .login(&login_req("alice", "wrong-password"))
            .unwrap_err();
        let unknown_user = service
            .login(&login_req("mallory", "password123"))
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::Auth(_)));
        assert!(matches!(unknown_user, AppError::Auth(_)));
        assert_eq!(wrong_password.to_string(), "Invalid username or password");
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn test_login_requires_fields() {
        let (service, _temp) = create_test_service();
        assert!(matches!(
            service.login(&login_req("", "")),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_logout_revokes_only_that_token() {
        let (service, _temp) = create_test_service();
        service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();

        let (first, _) = service.login(&login_req("alice", "password123")).unwrap();
        // Tokens are second-granular; a distinct iat keeps the two strings apart
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let (second, _) = service.login(&login_req("alice", "password123")).unwrap();
        assert_ne!(first.token, second.token);

        let identity = service.validate_token(&first.token).unwrap();
        service.logout(&first.token, &identity).unwrap();

        match service.validate_token(&first.token) {
            Err(AppError::Auth(msg)) => assert_eq!(msg, REVOKED_TOKEN),
            other => panic!("expected revoked, got {other:?}"),
        }
        assert!(service.validate_token(&second.token).is_ok());
    }

    #[test]
    fn test_token_in_final_second_cannot_outlive_logout() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let (service, _temp) = create_test_service();
        let user = service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: Role::User,
            iat: now - 60,
            exp: now,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        // exp == now is already past, for logout and validation alike
        assert!(matches!(
            service.logout(&token, &claims),
            Err(AppError::Auth(_))
        ));
        assert!(matches!(
            service.validate_token(&token),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_logout_rejects_foreign_identity() {
        let (service, _temp) = create_test_service();
        service
            .register(&register_req("alice", "alice@x.com", "080000000"))
            .unwrap();
        let (issued, _) = service.login(&login_req("alice", "password123")).unwrap();

        let mut impostor = service.validate_token(&issued.token).unwrap();
        impostor.sub += 1;

        assert!(matches!(
            service.logout(&issued.token, &impostor),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_garbage_token_skips_blacklist() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let blacklist = Arc::new(MemoryTokenBlacklist::new());
        let service = AuthService::new(
            Arc::new(SqliteUserStore::new(db_path).unwrap()),
            blacklist.clone(),
            JwtHandler::new(SECRET, 24),
            PasswordHasher::new(4).unwrap(),
        );

        match service.validate_token("garbage") {
            Err(AppError::Auth(msg)) => assert_eq!(msg, INVALID_TOKEN),
            other => panic!("expected auth failure, got {other:?}"),
        }
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_concurrent_registration_same_email() {
        let (service, _temp) = create_test_service();
        let service = Arc::new(service);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [("racer1", "0811111111"), ("racer2", "0822222222")]
            .into_iter()
            .map(|(username, phone)| {
                let service = service.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    service.register(&register_req(username, "same@x.com", phone))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(msg)) if msg == "email already exists"))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }
}
