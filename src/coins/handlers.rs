use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{ExchangeRequest, ExchangeResponse, RatesResponse, TransactionSummary},
    services::exchange_message,
};
use crate::{
    auth::{dto::PublicUser, extractors::AuthUser},
    error::{AppError, AppResult},
    extractors::ValidatedJson,
    state::AppState,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn coin_routes() -> Router<AppState> {
    Router::new()
        .route("/coins/exchange", post(exchange))
        .route("/coins/rates", get(rates))
}

fn idempotency_key(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(raw) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = raw
        .to_str()
        .map(str::trim)
        .map_err(|_| AppError::BadRequest("Invalid Idempotency-Key header".into()))?;
    if key.is_empty() || key.len() > 255 {
        return Err(AppError::BadRequest("Invalid Idempotency-Key header".into()));
    }
    Ok(Some(key.to_string()))
}

#[instrument(skip(state, headers))]
pub async fn exchange(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<ExchangeRequest>,
) -> AppResult<Json<ExchangeResponse>> {
    let key = idempotency_key(&headers)?;
    let outcome = state
        .storage
        .exchange_coins(user_id, payload.package_type, key)
        .await?;

    info!(
        user_id = %user_id,
        package = ?outcome.receipt.package_type,
        remaining = outcome.receipt.remaining_coins,
        replayed = outcome.replayed,
        "coins exchanged"
    );

    Ok(Json(ExchangeResponse {
        success: true,
        message: exchange_message(&outcome.receipt),
        transaction: TransactionSummary::from(&outcome.receipt),
        user: PublicUser::from(outcome.user),
    }))
}

pub async fn rates() -> Json<RatesResponse> {
    Json(RatesResponse::default())
}
