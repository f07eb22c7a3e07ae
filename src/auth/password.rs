//! Argon2id password hashing. Both operations are CPU bound and run on the
//! blocking pool, so callers simply `.await` them from a handler.

use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::task::spawn_blocking;
use tracing::error;

/// Hash `plain` into a PHC string with a fresh random salt.
pub async fn hash_password(plain: String) -> anyhow::Result<String> {
    spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hashing failed");
                anyhow!("password hashing failed: {e}")
            })
    })
    .await
    .context("password hashing task aborted")?
}

/// `Ok(false)` for a wrong password; `Err` only when `hash` is not a PHC string.
pub async fn verify_password(plain: String, hash: String) -> anyhow::Result<bool> {
    spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&hash).map_err(|e| {
            error!(error = %e, "stored password hash is unreadable");
            anyhow!("unreadable password hash: {e}")
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .context("password verification task aborted")?
}
