//! Identity re-verification for role saves
//!
//! Saving a role requires the editing user to enter their password again.
//! A successful check yields a short-lived token that travels in the
//! [`SaveContext`].

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::DEFAULT_VERIFICATION_TTL_SECS;
use crate::db::Lmdb;
use crate::error::{PrivmapError, Result};
use crate::store::SaveContext;

/// Issues and checks verification tokens
#[derive(Clone)]
pub struct Verifier {
    db: Lmdb,
    ttl_secs: u64,
}

impl Verifier {
    pub fn new(db: Lmdb) -> Self {
        Self::with_ttl(db, DEFAULT_VERIFICATION_TTL_SECS)
    }

    pub fn with_ttl(db: Lmdb, ttl_secs: u64) -> Self {
        Verifier { db, ttl_secs }
    }

    /// Set password for a user
    pub fn set_password(&self, user: &str, password: &str) -> Result<()> {
        let salt = generate_salt()?;
        let value = format!("{}|{}", salt, hash_password(&salt, password));
        self.db.write(|d, tx| Ok(d.credentials.put(tx, user, &value)?))
    }

    /// Verify password for a user. Unknown users fail verification.
    pub fn verify_password(&self, user: &str, password: &str) -> Result<bool> {
        self.db.read(|d, tx| {
            let Some(value) = d.credentials.get(tx, user)? else {
                return Ok(false);
            };
            let (salt, stored) = value
                .split_once('|')
                .ok_or_else(|| PrivmapError::Storage("corrupted credentials".into()))?;
            Ok(stored == hash_password(salt, password))
        })
    }

    /// Check the password and hand out a verification token
    pub fn issue(&self, user: &str, password: &str) -> Result<SaveContext> {
        if !self.verify_password(user, password)? {
            warn!(user, "identity verification failed");
            return Err(PrivmapError::InvalidCredentials);
        }
        let token = generate_token()?;
        let expires = now_millis() + self.ttl_secs * 1000;
        let value = format!("{}|{}", user, expires);
        self.db.write(|d, tx| Ok(d.verifications.put(tx, &hash_token(&token), &value)?))?;
        debug!(user, "issued verification token");
        Ok(SaveContext::new(token))
    }

    /// Validate a context, returns the verified user
    pub fn validate(&self, ctx: &SaveContext) -> Result<String> {
        let hash = hash_token(&ctx.access);
        self.db.read(|d, tx| {
            let value = d.verifications.get(tx, &hash)?.ok_or(PrivmapError::InvalidToken)?;
            let (user, expires) = value
                .split_once('|')
                .ok_or_else(|| PrivmapError::Storage("corrupted verification".into()))?;
            let expires: u64 = expires.parse().unwrap_or(0);
            if expires < now_millis() {
                return Err(PrivmapError::TokenExpired);
            }
            Ok(user.to_string())
        })
    }

    /// Revoke a token. Returns false if it was unknown.
    pub fn revoke(&self, ctx: &SaveContext) -> Result<bool> {
        let hash = hash_token(&ctx.access);
        self.db.write(|d, tx| Ok(d.verifications.delete(tx, &hash)?))
    }

    /// Drop expired tokens, returns how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        let now = now_millis();
        self.db.write(|d, tx| {
            let mut stale = Vec::new();
            for item in d.verifications.iter(tx)? {
                let (hash, value) = item?;
                let expires: u64 = value.rsplit('|').next().and_then(|s| s.parse().ok()).unwrap_or(0);
                if expires < now {
                    stale.push(hash.to_string());
                }
            }
            for hash in &stale {
                d.verifications.delete(tx, hash)?;
            }
            Ok(stale.len())
        })
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a cryptographically secure token (32 bytes, base64url encoded)
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| PrivmapError::Entropy(e.to_string()))?;
    Ok(base64url_encode(&bytes))
}

fn generate_salt() -> Result<String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| PrivmapError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Base64url encode without padding
fn base64url_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut result = String::with_capacity((data.len() * 4 + 2) / 3);
    for chunk in data.chunks(3) {
        let n = chunk.iter().enumerate().fold(0u32, |acc, (i, &b)| acc | (b as u32) << (16 - 8 * i));
        result.push(ALPHABET[((n >> 18) & 0x3F) as usize] as char);
        result.push(ALPHABET[((n >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 { result.push(ALPHABET[((n >> 6) & 0x3F) as usize] as char); }
        if chunk.len() > 2 { result.push(ALPHABET[(n & 0x3F) as usize] as char); }
    }
    result
}

mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        data.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_random_and_url_safe() {
        let t1 = generate_token().unwrap();
        let t2 = generate_token().unwrap();
        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 43);
        assert!(t1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn base64url_known_values() {
        assert_eq!(base64url_encode(b"f"), "Zg");
        assert_eq!(base64url_encode(b"fo"), "Zm8");
        assert_eq!(base64url_encode(b"foo"), "Zm9v");
        assert_eq!(base64url_encode(&[0xfb, 0xff]), "-_8");
    }
}
