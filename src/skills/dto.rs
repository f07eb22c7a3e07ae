use serde::{Deserialize, Serialize};
use validator::Validate;

use super::repo_types::SkillUpdate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSkillRequest {
    pub title: String,
    pub description: String,
    #[validate(range(min = 1, max = 1000, message = "Coins must be between 1 and 1000 (1 coin = 1 hour)"))]
    pub coins: i64,
    pub category: String,
}

/// Partial update. `sellerId` is not accepted; ownership never changes.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSkillRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "Coins must be between 1 and 1000 (1 coin = 1 hour)"))]
    pub coins: Option<i64>,
    pub category: Option<String>,
}

impl From<UpdateSkillRequest> for SkillUpdate {
    fn from(r: UpdateSkillRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            coins: r.coins,
            category: r.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteSkillResponse {
    pub success: bool,
    pub message: String,
}
