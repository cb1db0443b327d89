use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Cat, MatchDetail, MatchRequest, NewCat, NewMatchRequest, NewUser, User,
};
use crate::filter::CatFilter;

/// Which match requests count when asking whether a cat is "in" a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Pending only: not approved, not closed.
    Active,
    /// Pending or approved.
    NotClosed,
}

/// Entry point to persistent storage. Every service operation runs inside
/// exactly one unit of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// One storage transaction.
///
/// Writes become visible to other units only after `commit`; dropping the
/// unit without committing rolls everything back. `lock_*` methods hold the
/// returned rows exclusively until the unit ends.
#[async_trait]
pub trait UnitOfWork: Send {
    // Users
    async fn insert_user(&mut self, user: &NewUser) -> Result<User, DatabaseError>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError>;

    // Cats (lookups include soft-deleted rows; callers decide)
    async fn insert_cat(&mut self, owner_user_id: i64, cat: &NewCat) -> Result<Cat, DatabaseError>;
    async fn find_cat(&mut self, id: i64) -> Result<Option<Cat>, DatabaseError>;
    /// Locks in ascending id order. Unknown ids are simply absent from the result.
    async fn lock_cats(&mut self, ids: &[i64]) -> Result<Vec<Cat>, DatabaseError>;
    async fn list_cats(&mut self, filter: &CatFilter, caller_id: i64) -> Result<Vec<Cat>, DatabaseError>;
    async fn update_cat(&mut self, id: i64, cat: &NewCat) -> Result<Cat, DatabaseError>;
    async fn soft_delete_cat(&mut self, id: i64) -> Result<(), DatabaseError>;
    async fn mark_cats_matched(&mut self, ids: &[i64]) -> Result<(), DatabaseError>;

    // Match requests
    async fn cat_has_match(&mut self, cat_id: i64, scope: MatchScope) -> Result<bool, DatabaseError>;
    async fn insert_match(&mut self, request: &NewMatchRequest) -> Result<MatchRequest, DatabaseError>;
    async fn find_match(&mut self, id: i64) -> Result<Option<MatchRequest>, DatabaseError>;
    async fn lock_match(&mut self, id: i64) -> Result<Option<MatchRequest>, DatabaseError>;
    async fn approve_match(&mut self, id: i64) -> Result<(), DatabaseError>;
    async fn close_match(&mut self, id: i64) -> Result<(), DatabaseError>;
    /// Closes every active request touching any of `cat_ids` except `except_id`.
    async fn close_matches_for_cats(&mut self, cat_ids: &[i64], except_id: i64) -> Result<u64, DatabaseError>;
    /// Non-closed requests issued or received by `user_id`, newest first.
    async fn list_matches_for_user(&mut self, user_id: i64) -> Result<Vec<MatchDetail>, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;
}
