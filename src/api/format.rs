use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::{Cat, MatchDetail, MatchRequest, UserSummary};
use crate::error::ApiError;

/// Ids travel as strings on the wire.
fn wire_id(id: i64) -> String {
    id.to_string()
}

fn wire_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// An id supplied by a client, either as a JSON string or number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Number(i64),
    Text(String),
}

impl IdInput {
    /// Anything that is not a positive integer cannot name a row.
    pub fn resolve(&self, what: &str) -> Result<i64, ApiError> {
        match self {
            IdInput::Number(n) => Ok(*n),
            IdInput::Text(s) => parse_id(s, what),
        }
    }
}

pub fn parse_id(raw: &str, what: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::not_found(format!("{} not found", what)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatView {
    pub id: String,
    pub name: String,
    pub race: String,
    pub sex: String,
    pub age_in_month: i32,
    pub description: String,
    pub image_urls: Vec<String>,
    pub has_matched: bool,
    pub created_at: String,
}

impl From<&Cat> for CatView {
    fn from(cat: &Cat) -> Self {
        Self {
            id: wire_id(cat.id),
            name: cat.name.clone(),
            race: cat.race.to_string(),
            sex: cat.sex.to_string(),
            age_in_month: cat.age_in_month,
            description: cat.description.clone(),
            image_urls: cat.image_urls.clone(),
            has_matched: cat.has_matched,
            created_at: wire_time(cat.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedView {
    pub id: String,
    pub created_at: String,
}

impl From<&Cat> for CreatedView {
    fn from(cat: &Cat) -> Self {
        Self { id: wire_id(cat.id), created_at: wire_time(cat.created_at) }
    }
}

impl From<&MatchRequest> for CreatedView {
    fn from(request: &MatchRequest) -> Self {
        Self { id: wire_id(request.id), created_at: wire_time(request.created_at) }
    }
}

#[derive(Debug, Serialize)]
pub struct IdView {
    pub id: String,
}

impl From<i64> for IdView {
    fn from(id: i64) -> Self {
        Self { id: wire_id(id) }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<&UserSummary> for UserView {
    fn from(user: &UserSummary) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: wire_time(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub id: String,
    pub issued_by: UserView,
    pub received_by: UserView,
    pub user_cat_detail: CatView,
    pub match_cat_detail: CatView,
    pub message: String,
    pub status: bool,
    pub created_at: String,
}

impl From<&MatchDetail> for MatchView {
    fn from(detail: &MatchDetail) -> Self {
        Self {
            id: wire_id(detail.request.id),
            issued_by: UserView::from(&detail.issuer),
            received_by: UserView::from(&detail.receiver),
            user_cat_detail: CatView::from(&detail.issuer_cat),
            match_cat_detail: CatView::from(&detail.receiver_cat),
            message: detail.request.message.clone(),
            status: detail.request.status,
            created_at: wire_time(detail.request.created_at),
        }
    }
}
