//! Password hashing (bcrypt).

use anyhow::{Context, Result};
use bcrypt::{hash, verify};

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Verified against when the username is unknown, so both login
    /// failure paths cost one bcrypt verification
    decoy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self> {
        let decoy_hash =
            hash("decoy-password-never-matches", cost).context("Failed to hash password")?;
        Ok(Self { cost, decoy_hash })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        hash(password, self.cost).context("Failed to hash password")
    }

    pub fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        verify(password, password_hash).context("Failed to verify password")
    }

    /// Burn the same work as a real verification and report no match
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = verify(password, &self.decoy_hash);
        false
    }
}
