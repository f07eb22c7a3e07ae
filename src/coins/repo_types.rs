use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo_types::User;

/// A fixed (coins required, payout in dollars) pair.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ExchangeTier {
    pub coins: i64,
    pub price: i64,
}

pub const SMALL_PACKAGE: ExchangeTier = ExchangeTier {
    coins: 10,
    price: 25_000,
};

pub const LARGE_PACKAGE: ExchangeTier = ExchangeTier {
    coins: 1000,
    price: 30_000,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Small,
    Large,
}

impl PackageType {
    pub const fn tier(self) -> ExchangeTier {
        match self {
            PackageType::Small => SMALL_PACKAGE,
            PackageType::Large => LARGE_PACKAGE,
        }
    }
}

/// Result of a completed exchange, kept per idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeReceipt {
    pub package_type: PackageType,
    pub coins_exchanged: i64,
    pub amount_received: i64,
    pub remaining_coins: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub user: User,
    pub receipt: ExchangeReceipt,
    pub replayed: bool,
}
