use base64::{engine::general_purpose, Engine as _};
use ring::{pbkdf2, rand::{SecureRandom, SystemRandom}};
use std::num::NonZeroU32;

use crate::error::{AppError, Result};

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const SCHEME: &str = "pbkdf2-sha256";

pub struct PasswordHasher;

impl PasswordHasher {
    /// Encodes as `pbkdf2-sha256:<iterations>:<salt>:<hash>` with base64 parts.
    pub fn hash(password: &str) -> Result<String> {
        let rng = SystemRandom::new();
        let mut salt = [0u8; SALT_LEN];
        rng.fill(&mut salt)
            .map_err(|_| AppError::Crypto("Failed to generate salt".to_string()))?;

        let iterations = iterations(PBKDF2_ITERATIONS)?;
        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, password.as_bytes(), &mut hash);

        Ok(format!(
            "{}:{}:{}:{}",
            SCHEME,
            PBKDF2_ITERATIONS,
            general_purpose::STANDARD.encode(salt),
            general_purpose::STANDARD.encode(hash)
        ))
    }

    pub fn verify(password: &str, stored: &str) -> Result<bool> {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 4 || parts[0] != SCHEME {
            return Err(AppError::Crypto("Invalid password hash format".to_string()));
        }
        let rounds = parts[1]
            .parse::<u32>()
            .map_err(|e| AppError::Crypto(format!("Parse iterations: {}", e)))?;
        let salt = general_purpose::STANDARD
            .decode(parts[2])
            .map_err(|e| AppError::Crypto(format!("Decode salt: {}", e)))?;
        let hash = general_purpose::STANDARD
            .decode(parts[3])
            .map_err(|e| AppError::Crypto(format!("Decode hash: {}", e)))?;

        Ok(pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, iterations(rounds)?, &salt, password.as_bytes(), &hash).is_ok())
    }
}

fn iterations(rounds: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(rounds).ok_or_else(|| AppError::Crypto("Invalid iterations".to_string()))
}
