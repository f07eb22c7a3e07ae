use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub coins: i64,
    pub category: String,
    pub seller_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewSkill {
    pub title: String,
    pub description: String,
    pub coins: i64,
    pub category: String,
    pub seller_id: Uuid,
}

/// Partial update; `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct SkillUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub coins: Option<i64>,
    pub category: Option<String>,
}

impl Skill {
    pub fn apply(&mut self, updates: SkillUpdate) {
        if let Some(title) = updates.title {
            self.title = title;
        }
        if let Some(description) = updates.description {
            self.description = description;
        }
        if let Some(coins) = updates.coins {
            self.coins = coins;
        }
        if let Some(category) = updates.category {
            self.category = category;
        }
    }
}

/// Public part of the seller attached to listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seller {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for Seller {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillWithSeller {
    #[serde(flatten)]
    pub skill: Skill,
    pub seller: Seller,
}
