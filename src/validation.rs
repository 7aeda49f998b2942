//! Request field checks producing a field -> message map.

use crate::auth::models::Role;
use crate::errors::{AppError, FieldErrors};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 100;
pub const PHONE_MIN_DIGITS: usize = 8;
pub const PHONE_MAX_DIGITS: usize = 15;
pub const PASSWORD_MIN: usize = 8;

/// Collects per-field failures; the first failure per field wins
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: FieldErrors,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_insert(message);
    }

    pub fn username(&mut self, value: &str, required: bool) -> &mut Self {
        if let Some(message) = check_username(value, required) {
            self.fail("username", message);
        }
        self
    }

    pub fn email(&mut self, value: &str, required: bool) -> &mut Self {
        if let Some(message) = check_email(value, required) {
            self.fail("email", message);
        }
        self
    }

    pub fn phone(&mut self, value: &str, required: bool) -> &mut Self {
        if let Some(message) = check_phone(value, required) {
            self.fail("phone", message);
        }
        self
    }

    pub fn password(&mut self, password: &str, confirm: &str) -> &mut Self {
        if password.is_empty() {
            self.fail("password", "password is required".to_string());
        } else if password.chars().count() < PASSWORD_MIN {
            self.fail(
                "password",
                format!("password must be at least {PASSWORD_MIN} characters"),
            );
        }

        if confirm.is_empty() {
            self.fail(
                "confirm_password",
                "confirm_password is required".to_string(),
            );
        } else if confirm != password {
            self.fail(
                "confirm_password",
                "confirm_password must match password".to_string(),
            );
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.fail(field, format!("{field} is required"));
        }
        self
    }

    /// Parses an optional role; empty means "not supplied"
    pub fn role(&mut self, value: &str, required: bool) -> Option<Role> {
        if value.is_empty() {
            if required {
                self.fail("role", "role is required".to_string());
            }
            return None;
        }
        let role = Role::parse(value);
        if role.is_none() {
            self.fail("role", "role must be one of: user admin".to_string());
        }
        role
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(std::mem::take(&mut self.errors)))
        }
    }
}

fn check_username(value: &str, required: bool) -> Option<String> {
    if value.is_empty() {
        return required.then(|| "username is required".to_string());
    }
    let len = value.chars().count();
    if len < USERNAME_MIN {
        Some(format!("username must be at least {USERNAME_MIN} characters"))
    } else if len > USERNAME_MAX {
        Some(format!("username must not exceed {USERNAME_MAX} characters"))
    } else if value.chars().any(char::is_whitespace) {
        Some("username must not contain whitespace".to_string())
    } else {
        None
    }
}

fn check_email(value: &str, required: bool) -> Option<String> {
    if value.is_empty() {
        return required.then(|| "email is required".to_string());
    }
    if value.chars().count() > EMAIL_MAX {
        return Some(format!("email must not exceed {EMAIL_MAX} characters"));
    }
    if is_plausible_email(value) {
        None
    } else {
        Some("email must be a valid email address".to_string())
    }
}

fn is_plausible_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn check_phone(value: &str, required: bool) -> Option<String> {
    if value.is_empty() {
        return required.then(|| "phone is required".to_string());
    }
    let digits = value.strip_prefix('+').unwrap_or(value);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Some("phone must contain only digits".to_string());
    }
    match digits.len() {
        n if n < PHONE_MIN_DIGITS => Some(format!(
            "phone must be at least {PHONE_MIN_DIGITS} digits"
        )),
        n if n > PHONE_MAX_DIGITS => Some(format!(
            "phone must not exceed {PHONE_MAX_DIGITS} digits"
        )),
        _ => None,
    }
}
