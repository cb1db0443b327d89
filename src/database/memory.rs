use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Cat, MatchDetail, MatchRequest, NewCat, NewMatchRequest, NewUser, User, UserSummary,
};
use crate::database::store::{MatchScope, Store, UnitOfWork};
use crate::filter::CatFilter;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: Vec<User>,
    cats: Vec<Cat>,
    matches: Vec<MatchRequest>,
    last_user_id: i64,
    last_cat_id: i64,
    last_match_id: i64,
}

/// In-process store used by tests and `serve --memory`.
///
/// A unit of work holds the whole-store lock for its lifetime and mutates a
/// private copy, so units are fully serialized and an uncommitted unit
/// leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryUnit { guard, work }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

impl MemoryUnit {
    fn cat_mut(&mut self, id: i64) -> Result<&mut Cat, DatabaseError> {
        self.work
            .cats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DatabaseError::QueryError(format!("cat {} not found", id)))
    }

    fn match_mut(&mut self, id: i64) -> Result<&mut MatchRequest, DatabaseError> {
        self.work
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| DatabaseError::QueryError(format!("match request {} not found", id)))
    }

    fn user_summary(&self, id: i64) -> Result<UserSummary, DatabaseError> {
        self.work
            .users
            .iter()
            .find(|u| u.id == id)
            .map(UserSummary::from)
            .ok_or_else(|| DatabaseError::QueryError(format!("user {} not found", id)))
    }

    fn cat(&self, id: i64) -> Result<Cat, DatabaseError> {
        self.work
            .cats
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| DatabaseError::QueryError(format!("cat {} not found", id)))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn insert_user(&mut self, user: &NewUser) -> Result<User, DatabaseError> {
        if self.work.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }
        self.work.last_user_id += 1;
        let row = User {
            id: self.work.last_user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            created_at: Utc::now(),
        };
        self.work.users.push(row.clone());
        Ok(row)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.work.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_cat(&mut self, owner_user_id: i64, cat: &NewCat) -> Result<Cat, DatabaseError> {
        self.work.last_cat_id += 1;
        let row = Cat {
            id: self.work.last_cat_id,
            owner_user_id,
            name: cat.name.clone(),
            race: cat.race,
            sex: cat.sex,
            age_in_month: cat.age_in_month,
            description: cat.description.clone(),
            image_urls: cat.image_urls.clone(),
            has_matched: false,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.work.cats.push(row.clone());
        Ok(row)
    }

    async fn find_cat(&mut self, id: i64) -> Result<Option<Cat>, DatabaseError> {
        Ok(self.work.cats.iter().find(|c| c.id == id).cloned())
    }

    async fn lock_cats(&mut self, ids: &[i64]) -> Result<Vec<Cat>, DatabaseError> {
        let mut cats: Vec<Cat> = self
            .work
            .cats
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect();
        cats.sort_by_key(|c| c.id);
        Ok(cats)
    }

    async fn list_cats(&mut self, filter: &CatFilter, caller_id: i64) -> Result<Vec<Cat>, DatabaseError> {
        let mut cats: Vec<Cat> = self
            .work
            .cats
            .iter()
            .filter(|c| filter.matches(c, caller_id))
            .cloned()
            .collect();
        cats.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(cats
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn update_cat(&mut self, id: i64, cat: &NewCat) -> Result<Cat, DatabaseError> {
        let row = self.cat_mut(id)?;
        row.name = cat.name.clone();
        row.race = cat.race;
        row.sex = cat.sex;
        row.age_in_month = cat.age_in_month;
        row.description = cat.description.clone();
        row.image_urls = cat.image_urls.clone();
        Ok(row.clone())
    }

    async fn soft_delete_cat(&mut self, id: i64) -> Result<(), DatabaseError> {
        let row = self.cat_mut(id)?;
        if row.deleted_at.is_none() {
            row.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_cats_matched(&mut self, ids: &[i64]) -> Result<(), DatabaseError> {
        for cat in self.work.cats.iter_mut().filter(|c| ids.contains(&c.id)) {
            cat.has_matched = true;
        }
        Ok(())
    }

    async fn cat_has_match(&mut self, cat_id: i64, scope: MatchScope) -> Result<bool, DatabaseError> {
        Ok(self.work.matches.iter().any(|m| {
            m.involves(cat_id)
                && match scope {
                    MatchScope::Active => m.is_active(),
                    MatchScope::NotClosed => m.status || m.deleted_at.is_none(),
                }
        }))
    }

    async fn insert_match(&mut self, request: &NewMatchRequest) -> Result<MatchRequest, DatabaseError> {
        self.work.last_match_id += 1;
        let row = MatchRequest {
            id: self.work.last_match_id,
            issuer_user_id: request.issuer_user_id,
            issuer_cat_id: request.issuer_cat_id,
            receiver_user_id: request.receiver_user_id,
            receiver_cat_id: request.receiver_cat_id,
            message: request.message.clone(),
            status: false,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.work.matches.push(row.clone());
        Ok(row)
    }

    async fn find_match(&mut self, id: i64) -> Result<Option<MatchRequest>, DatabaseError> {
        Ok(self.work.matches.iter().find(|m| m.id == id).cloned())
    }

    async fn lock_match(&mut self, id: i64) -> Result<Option<MatchRequest>, DatabaseError> {
        self.find_match(id).await
    }

    async fn approve_match(&mut self, id: i64) -> Result<(), DatabaseError> {
        self.match_mut(id)?.status = true;
        Ok(())
    }

    async fn close_match(&mut self, id: i64) -> Result<(), DatabaseError> {
        let row = self.match_mut(id)?;
        if row.deleted_at.is_none() {
            row.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn close_matches_for_cats(&mut self, cat_ids: &[i64], except_id: i64) -> Result<u64, DatabaseError> {
        let now = Utc::now();
        let mut closed = 0;
        for m in self.work.matches.iter_mut() {
            let touches = cat_ids.iter().any(|id| m.involves(*id));
            if m.id != except_id && touches && m.is_active() {
                m.deleted_at = Some(now);
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn list_matches_for_user(&mut self, user_id: i64) -> Result<Vec<MatchDetail>, DatabaseError> {
        let mut requests: Vec<MatchRequest> = self
            .work
            .matches
            .iter()
            .filter(|m| m.status || m.deleted_at.is_none())
            .filter(|m| m.issuer_user_id == user_id || m.receiver_user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        requests
            .into_iter()
            .map(|request| {
                Ok(MatchDetail {
                    issuer: self.user_summary(request.issuer_user_id)?,
                    receiver: self.user_summary(request.receiver_user_id)?,
                    issuer_cat: self.cat(request.issuer_cat_id)?,
                    receiver_cat: self.cat(request.receiver_cat_id)?,
                    request,
                })
            })
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryUnit { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
