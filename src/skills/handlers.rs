use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateSkillRequest, DeleteSkillResponse, UpdateSkillRequest},
    repo_types::{NewSkill, Skill, SkillWithSeller},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extractors::ValidatedJson,
    state::AppState,
};

/// Reads are public; writes go through `AuthUser`.
pub fn skill_routes() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills).post(create_skill))
        .route(
            "/skills/:id",
            get(get_skill).put(update_skill).delete(delete_skill),
        )
}

// Missing and not-owned skills are reported identically.
fn not_found_or_unauthorized() -> AppError {
    AppError::NotFound("Skill not found or unauthorized".into())
}

/// Anything that is not a UUID cannot name a stored skill.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

#[instrument(skip(state))]
pub async fn list_skills(State(state): State<AppState>) -> AppResult<Json<Vec<SkillWithSeller>>> {
    Ok(Json(state.storage.get_skills().await?))
}

#[instrument(skip(state))]
pub async fn get_skill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<SkillWithSeller>> {
    let not_found = || AppError::NotFound("Skill not found".into());
    let id = parse_id(&id).ok_or_else(not_found)?;
    let skill = state.storage.get_skill_by_id(id).await?.ok_or_else(not_found)?;
    Ok(Json(skill))
}

#[instrument(skip(state, payload))]
pub async fn create_skill(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateSkillRequest>,
) -> AppResult<(StatusCode, Json<Skill>)> {
    let skill = state
        .storage
        .create_skill(NewSkill {
            title: payload.title,
            description: payload.description,
            coins: payload.coins,
            category: payload.category,
            seller_id: user_id,
        })
        .await?;

    info!(skill_id = %skill.id, seller_id = %user_id, coins = skill.coins, "skill created");
    Ok((StatusCode::CREATED, Json(skill)))
}

#[instrument(skip(state, payload))]
pub async fn update_skill(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateSkillRequest>,
) -> AppResult<Json<Skill>> {
    let id = parse_id(&id).ok_or_else(not_found_or_unauthorized)?;
    let skill = state
        .storage
        .update_skill(id, user_id, payload.into())
        .await
        .ok_or_else(|| {
            warn!(skill_id = %id, user_id = %user_id, "update rejected");
            not_found_or_unauthorized()
        })?;

    info!(skill_id = %skill.id, "skill updated");
    Ok(Json(skill))
}

#[instrument(skip(state))]
pub async fn delete_skill(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteSkillResponse>> {
    let id = parse_id(&id).ok_or_else(not_found_or_unauthorized)?;
    if !state.storage.delete_skill(id, user_id).await {
        warn!(skill_id = %id, user_id = %user_id, "delete rejected");
        return Err(not_found_or_unauthorized());
    }

    info!(skill_id = %id, "skill deleted");
    Ok(Json(DeleteSkillResponse {
        success: true,
        message: "Skill deleted successfully".into(),
    }))
}
