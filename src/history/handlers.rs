use axum::{
    extract::{DefaultBodyLimit, Path, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateHistoryRequest, HistoryResponse};
use super::services::{remove_image, save_outfit, to_response, to_responses};
use crate::{
    auth::{dto::MessageResponse, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(list_history).post(create_history))
        .route("/history/", get(list_history).post(create_history))
        .route("/history/:id", delete(delete_history))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state, body), fields(user_id = %auth.id))]
pub async fn create_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateHistoryRequest>,
) -> ApiResult<Json<HistoryResponse>> {
    let record = save_outfit(&state, auth.id, body.outfit).await?;
    Ok(Json(to_response(&state, record).await))
}

#[instrument(skip(state), fields(user_id = %auth.id))]
pub async fn list_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<HistoryResponse>>> {
    let records = state.history.list_by_user(auth.id).await?;
    Ok(Json(to_responses(&state, records).await))
}

#[instrument(skip(state), fields(user_id = %auth.id))]
pub async fn delete_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let not_found = || ApiError::NotFound("History item not found".into());

    // A malformed id cannot name an existing record.
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let record = state.history.find(id).await?.ok_or_else(not_found)?;

    if record.user_id != auth.id {
        warn!(history_id = %id, owner = %record.user_id, "delete of foreign history item");
        return Err(ApiError::Unauthorized("Not authorized".into()));
    }

    if !state.history.delete(id).await? {
        return Err(not_found());
    }
    if let Some(key) = &record.image_key {
        remove_image(&state, key).await;
    }

    info!(history_id = %id, "history item removed");
    Ok(Json(MessageResponse::new("History item removed")))
}
