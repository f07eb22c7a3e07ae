use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::repo_types::User;

/// Request body for user registration. Name and email are normalized while
/// decoding, so the rules below see the stored values.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(deserialize_with = "email_normalized")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(deserialize_with = "email_normalized")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: PublicUser,
    pub token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub coins: i64,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            coins: u.coins,
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

fn email_normalized<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_email(&raw))
}
