//! Service Configuration
//! Mission: Validate startup settings once and hand them to every component

use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const MIN_SECRET_LEN: usize = 32;
/// One year
pub const MAX_EXPIRATION_HOURS: i64 = 8760;

/// Credentials for the admin account seeded at startup
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
    /// Zero disables the background sweep
    pub cleanup_interval: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT secret must be at least {MIN_SECRET_LEN} bytes");
        }
        if !(1..=MAX_EXPIRATION_HOURS).contains(&self.jwt_expiration_hours) {
            bail!("JWT expiration must be between 1 and {MAX_EXPIRATION_HOURS} hours");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("bcrypt cost must be between 4 and 31");
        }
        if self.database_path.trim().is_empty() {
            bail!("database path must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            database_path: "./test.db".to_string(),
            jwt_secret: "x".repeat(32),
            jwt_expiration_hours: 24,
            bcrypt_cost: 12,
            cleanup_interval: Duration::from_secs(3600),
            bootstrap_admin: None,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let cfg = Config {
            jwt_secret: "short".to_string(),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_expiration_hours_bounds() {
        for hours in [0, -1, MAX_EXPIRATION_HOURS + 1, i64::MAX / 2] {
            let cfg = Config {
                jwt_expiration_hours: hours,
                ..base()
            };
            assert!(cfg.validate().is_err(), "{hours} accepted");
        }

        let year = Config {
            jwt_expiration_hours: MAX_EXPIRATION_HOURS,
            ..base()
        };
        assert!(year.validate().is_ok());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let low = Config {
            bcrypt_cost: 3,
            ..base()
        };
        let high = Config {
            bcrypt_cost: 32,
            ..base()
        };
        assert!(low.validate().is_err());
        assert!(high.validate().is_err());
    }
}
