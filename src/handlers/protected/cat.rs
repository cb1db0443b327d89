use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::api::format::{parse_id, CatView, CreatedView, IdView};
use crate::filter::CatQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::CatInput;

/// POST /v1/cat
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CatInput>, JsonRejection>,
) -> ApiResult<CreatedView> {
    let Json(input) = payload?;
    let cat = state.cats.create(user.user_id, &input).await?;
    Ok(ApiResponse::created("success", CreatedView::from(&cat)))
}

/// GET /v1/cat
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<CatQuery>, QueryRejection>,
) -> ApiResult<Vec<CatView>> {
    let Query(query) = query?;
    let cats = state.cats.list(user.user_id, &query).await?;
    Ok(ApiResponse::success("success", cats.iter().map(CatView::from).collect()))
}

/// PUT /v1/cat/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<CatInput>, JsonRejection>,
) -> ApiResult<CatView> {
    let cat_id = parse_id(&id, "cat")?;
    let Json(input) = payload?;
    let cat = state.cats.update(user.user_id, cat_id, &input).await?;
    Ok(ApiResponse::success("successfully update cat", CatView::from(&cat)))
}

/// DELETE /v1/cat/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<IdView> {
    let cat_id = parse_id(&id, "cat")?;
    let deleted = state.cats.delete(user.user_id, cat_id).await?;
    Ok(ApiResponse::success("successfully delete cat", IdView::from(deleted)))
}
