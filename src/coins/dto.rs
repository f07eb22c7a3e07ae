use serde::{Deserialize, Serialize};
use validator::Validate;

use super::repo_types::{ExchangeReceipt, ExchangeTier, PackageType, LARGE_PACKAGE, SMALL_PACKAGE};
use crate::auth::dto::PublicUser;

/// `PackageType` only decodes `"small"` or `"large"`, so there are no extra rules.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub package_type: PackageType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub coins_exchanged: i64,
    pub amount_received: i64,
    pub remaining_coins: i64,
}

impl From<&ExchangeReceipt> for TransactionSummary {
    fn from(r: &ExchangeReceipt) -> Self {
        Self {
            coins_exchanged: r.coins_exchanged,
            amount_received: r.amount_received,
            remaining_coins: r.remaining_coins,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
    pub transaction: TransactionSummary,
}

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    pub small: ExchangeTier,
    pub large: ExchangeTier,
}

impl Default for RatesResponse {
    fn default() -> Self {
        Self {
            small: SMALL_PACKAGE,
            large: LARGE_PACKAGE,
        }
    }
}
