use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::Session;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// POST /v1/user/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(body) = payload?;
    let session = state.users.register(&body.email, &body.name, &body.password).await?;
    Ok(ApiResponse::created("User registered successfully", session))
}

/// POST /v1/user/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(body) = payload?;
    let session = state.users.login(&body.email, &body.password).await?;
    Ok(ApiResponse::success("User logged successfully", session))
}
