use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::api::format::{parse_id, CreatedView, IdInput, IdView, MatchView};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::validation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeBody {
    pub match_cat_id: IdInput,
    pub user_cat_id: IdInput,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBody {
    pub match_id: IdInput,
}

/// POST /v1/cat/match
pub async fn propose(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ProposeBody>, JsonRejection>,
) -> ApiResult<CreatedView> {
    let Json(body) = payload?;
    // message is judged before either cat is looked up
    validation::match_message(&body.message)?;
    let user_cat_id = body.user_cat_id.resolve("cat")?;
    let match_cat_id = body.match_cat_id.resolve("cat")?;
    let request = state
        .matches
        .propose(user.user_id, user_cat_id, match_cat_id, &body.message)
        .await?;
    Ok(ApiResponse::created("successfully send match request", CreatedView::from(&request)))
}

/// GET /v1/cat/match
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<MatchView>> {
    let details = state.matches.list(user.user_id).await?;
    Ok(ApiResponse::success("success", details.iter().map(MatchView::from).collect()))
}

/// POST /v1/cat/match/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<DecisionBody>, JsonRejection>,
) -> ApiResult<IdView> {
    let Json(body) = payload?;
    let match_id = body.match_id.resolve("match request")?;
    let approved = state.matches.approve(user.user_id, match_id).await?;
    Ok(ApiResponse::success("successfully matches the cat match request", IdView::from(approved)))
}

/// POST /v1/cat/match/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<DecisionBody>, JsonRejection>,
) -> ApiResult<IdView> {
    let Json(body) = payload?;
    let match_id = body.match_id.resolve("match request")?;
    let rejected = state.matches.reject(user.user_id, match_id).await?;
    Ok(ApiResponse::success("successfully reject the cat match request", IdView::from(rejected)))
}

/// DELETE /v1/cat/match/:id
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<IdView> {
    let match_id = parse_id(&id, "match request")?;
    let cancelled = state.matches.cancel(user.user_id, match_id).await?;
    Ok(ApiResponse::success("successfully remove a cat match request", IdView::from(cancelled)))
}
