use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, User},
    coins::repo_types::{ExchangeOutcome, ExchangeReceipt, PackageType},
    skills::repo_types::{NewSkill, Seller, Skill, SkillUpdate, SkillWithSeller},
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("email already registered")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("insufficient coins: need {required}, have {balance}")]
    InsufficientCoins { required: i64, balance: i64 },
    #[error("idempotency key reused with a different package")]
    IdempotencyConflict,
    #[error("seller not found for skill {skill_id}")]
    DanglingSeller { skill_id: Uuid },
    #[error("coin balance cannot be negative: {0}")]
    NegativeBalance(i64),
}

/// How long an exchange receipt can be replayed by its idempotency key.
pub const RECEIPT_TTL: Duration = Duration::hours(24);
/// Upper bound on stored receipts; the oldest are evicted first.
pub const RECEIPT_CAP: usize = 10_000;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;
    /// Fails with `UserNotFound` for an unknown id and `NegativeBalance`
    /// for `coins < 0`.
    async fn update_user_coins(&self, id: Uuid, coins: i64) -> Result<User, StorageError>;

    async fn get_skills(&self) -> Result<Vec<SkillWithSeller>, StorageError>;
    async fn get_skill_by_id(&self, id: Uuid) -> Result<Option<SkillWithSeller>, StorageError>;
    async fn create_skill(&self, skill: NewSkill) -> Result<Skill, StorageError>;
    /// Owner-scoped: returns `None` both when the skill is missing and when
    /// `user_id` is not its seller.
    async fn update_skill(&self, id: Uuid, user_id: Uuid, updates: SkillUpdate) -> Option<Skill>;
    /// Owner-scoped, same rule as `update_skill`.
    async fn delete_skill(&self, id: Uuid, user_id: Uuid) -> bool;

    /// Check the balance and debit it in one step. With an idempotency key,
    /// a repeated call returns the first receipt without debiting again.
    async fn exchange_coins(
        &self,
        user_id: Uuid,
        package: PackageType,
        idempotency_key: Option<String>,
    ) -> Result<ExchangeOutcome, StorageError>;
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    skills: HashMap<Uuid, Skill>,
    receipts: HashMap<(Uuid, String), ExchangeReceipt>,
}

impl Tables {
    fn prune_receipts(&mut self, now: OffsetDateTime, ttl: Duration, cap: usize) {
        self.receipts.retain(|_, r| now - r.created_at < ttl);
        while self.receipts.len() >= cap {
            let Some(oldest) = self
                .receipts
                .iter()
                .min_by_key(|(_, r)| r.created_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            self.receipts.remove(&oldest);
        }
    }

    fn with_seller(&self, skill: &Skill) -> Result<SkillWithSeller, StorageError> {
        let seller = self.users.get(&skill.seller_id).ok_or_else(|| {
            error!(skill_id = %skill.id, seller_id = %skill.seller_id, "skill references missing seller");
            StorageError::DanglingSeller { skill_id: skill.id }
        })?;
        Ok(SkillWithSeller {
            skill: skill.clone(),
            seller: Seller::from(seller),
        })
    }
}

/// In-memory storage. Everything is lost on restart.
///
/// A single lock guards all tables so that every check-then-write sequence
/// runs without interleaving.
pub struct MemStorage {
    tables: RwLock<Tables>,
    receipt_ttl: Duration,
    receipt_cap: usize,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::with_receipt_limits(RECEIPT_TTL, RECEIPT_CAP)
    }
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receipt_limits(receipt_ttl: Duration, receipt_cap: usize) -> Self {
        Self {
            tables: RwLock::default(),
            receipt_ttl,
            receipt_cap: receipt_cap.max(1),
        }
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.tables.read().await.users.get(&id).cloned()
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StorageError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == new.email) {
            return Err(StorageError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            coins: 0,
        };
        t.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "user stored");
        Ok(user)
    }

    async fn update_user_coins(&self, id: Uuid, coins: i64) -> Result<User, StorageError> {
        if coins < 0 {
            return Err(StorageError::NegativeBalance(coins));
        }
        let mut t = self.tables.write().await;
        let user = t.users.get_mut(&id).ok_or(StorageError::UserNotFound)?;
        user.coins = coins;
        Ok(user.clone())
    }

    async fn get_skills(&self) -> Result<Vec<SkillWithSeller>, StorageError> {
        let t = self.tables.read().await;
        let mut skills: Vec<&Skill> = t.skills.values().collect();
        skills.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        skills.into_iter().map(|s| t.with_seller(s)).collect()
    }

    async fn get_skill_by_id(&self, id: Uuid) -> Result<Option<SkillWithSeller>, StorageError> {
        let t = self.tables.read().await;
        match t.skills.get(&id) {
            Some(skill) => t.with_seller(skill).map(Some),
            None => Ok(None),
        }
    }

    async fn create_skill(&self, new: NewSkill) -> Result<Skill, StorageError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&new.seller_id) {
            return Err(StorageError::UserNotFound);
        }
        let skill = Skill {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            coins: new.coins,
            category: new.category,
            seller_id: new.seller_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.skills.insert(skill.id, skill.clone());
        debug!(skill_id = %skill.id, seller_id = %skill.seller_id, "skill stored");
        Ok(skill)
    }

    async fn update_skill(&self, id: Uuid, user_id: Uuid, updates: SkillUpdate) -> Option<Skill> {
        let mut t = self.tables.write().await;
        let skill = t.skills.get_mut(&id).filter(|s| s.seller_id == user_id)?;
        skill.apply(updates);
        Some(skill.clone())
    }

    async fn delete_skill(&self, id: Uuid, user_id: Uuid) -> bool {
        let mut t = self.tables.write().await;
        let owned = t.skills.get(&id).is_some_and(|s| s.seller_id == user_id);
        owned && t.skills.remove(&id).is_some()
    }

    async fn exchange_coins(
        &self,
        user_id: Uuid,
        package: PackageType,
        idempotency_key: Option<String>,
    ) -> Result<ExchangeOutcome, StorageError> {
        let mut t = self.tables.write().await;

        if let Some(key) = &idempotency_key {
            let live = t
                .receipts
                .get(&(user_id, key.clone()))
                .filter(|r| OffsetDateTime::now_utc() - r.created_at < self.receipt_ttl);
            if let Some(receipt) = live {
                if receipt.package_type != package {
                    return Err(StorageError::IdempotencyConflict);
                }
                let receipt = receipt.clone();
                let user = t
                    .users
                    .get(&user_id)
                    .cloned()
                    .ok_or(StorageError::UserNotFound)?;
                return Ok(ExchangeOutcome {
                    user,
                    receipt,
                    replayed: true,
                });
            }
        }

        let tier = package.tier();
        let user = t.users.get_mut(&user_id).ok_or(StorageError::UserNotFound)?;
        if user.coins < tier.coins {
            return Err(StorageError::InsufficientCoins {
                required: tier.coins,
                balance: user.coins,
            });
        }
        user.coins -= tier.coins;
        let user = user.clone();

        let now = OffsetDateTime::now_utc();
        let receipt = ExchangeReceipt {
            package_type: package,
            coins_exchanged: tier.coins,
            amount_received: tier.price,
            remaining_coins: user.coins,
            created_at: now,
        };
        if let Some(key) = idempotency_key {
            t.prune_receipts(now, self.receipt_ttl, self.receipt_cap);
            t.receipts.insert((user_id, key), receipt.clone());
        }

        Ok(ExchangeOutcome {
            user,
            receipt,
            replayed: false,
        })
    }
}
