use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::cat::Cat;
use super::user::UserSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MatchRequest {
    pub id: i64,
    pub issuer_user_id: i64,
    pub issuer_cat_id: i64,
    pub receiver_user_id: i64,
    pub receiver_cat_id: i64,
    pub message: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Lifecycle position of a match request. Approved and Closed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Active,
    Approved,
    Closed,
}

impl MatchRequest {
    pub fn state(&self) -> MatchState {
        if self.status {
            MatchState::Approved
        } else if self.deleted_at.is_some() {
            MatchState::Closed
        } else {
            MatchState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == MatchState::Active
    }

    pub fn involves(&self, cat_id: i64) -> bool {
        self.issuer_cat_id == cat_id || self.receiver_cat_id == cat_id
    }
}

#[derive(Debug, Clone)]
pub struct NewMatchRequest {
    pub issuer_user_id: i64,
    pub issuer_cat_id: i64,
    pub receiver_user_id: i64,
    pub receiver_cat_id: i64,
    pub message: String,
}

/// A match request joined with both users and both cats.
#[derive(Debug, Clone)]
pub struct MatchDetail {
    pub request: MatchRequest,
    pub issuer: UserSummary,
    pub receiver: UserSummary,
    pub issuer_cat: Cat,
    pub receiver_cat: Cat,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: bool, deleted: bool) -> MatchRequest {
        MatchRequest {
            id: 1,
            issuer_user_id: 1,
            issuer_cat_id: 10,
            receiver_user_id: 2,
            receiver_cat_id: 20,
            message: "hello there".to_string(),
            status,
            created_at: Utc::now(),
            deleted_at: deleted.then(Utc::now),
        }
    }

    #[test]
    fn state_follows_status_and_deleted_at() {
        assert_eq!(request(false, false).state(), MatchState::Active);
        assert_eq!(request(true, false).state(), MatchState::Approved);
        assert_eq!(request(false, true).state(), MatchState::Closed);
    }

    #[test]
    fn involves_either_cat() {
        let r = request(false, false);
        assert!(r.involves(10));
        assert!(r.involves(20));
        assert!(!r.involves(30));
    }
}
