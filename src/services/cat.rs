use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::{with_timeout, ServiceError};
use crate::config::FilterConfig;
use crate::database::models::Cat;
use crate::database::{MatchScope, Store, UnitOfWork};
use crate::filter::{CatFilter, CatQuery};
use crate::validation;

/// Unvalidated cat payload, shared by create and update. Missing fields
/// deserialize to empty values and are reported by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatInput {
    pub name: String,
    pub race: String,
    pub sex: String,
    pub age_in_month: i64,
    pub description: String,
    pub image_urls: Vec<String>,
}

#[derive(Clone)]
pub struct CatService {
    store: Arc<dyn Store>,
    filter: FilterConfig,
    timeout: Duration,
}

impl CatService {
    pub fn new(store: Arc<dyn Store>, filter: FilterConfig, timeout: Duration) -> Self {
        Self { store, filter, timeout }
    }

    pub async fn create(&self, owner_user_id: i64, input: &CatInput) -> Result<Cat, ServiceError> {
        let new_cat = validation::cat(input)?;

        let cat = with_timeout(self.timeout, "create cat", async {
            let mut uow = self.store.begin().await?;
            let cat = uow.insert_cat(owner_user_id, &new_cat).await?;
            uow.commit().await?;
            Ok(cat)
        })
        .await?;

        info!("User {} created cat {}", owner_user_id, cat.id);
        Ok(cat)
    }

    pub async fn list(&self, caller_id: i64, query: &CatQuery) -> Result<Vec<Cat>, ServiceError> {
        let filter = CatFilter::from_query(query, &self.filter)?;

        with_timeout(self.timeout, "list cats", async {
            let mut uow = self.store.begin().await?;
            Ok(uow.list_cats(&filter, caller_id).await?)
        })
        .await
    }

    pub async fn update(&self, caller_id: i64, cat_id: i64, input: &CatInput) -> Result<Cat, ServiceError> {
        let changes = validation::cat(input)?;

        let cat = with_timeout(self.timeout, "update cat", async {
            let mut uow = self.store.begin().await?;
            let cat = lock_owned_cat(&mut *uow, caller_id, cat_id).await?;
            if cat.has_matched {
                return Err(ServiceError::Conflict("cat has already matched".to_string()));
            }
            if uow.cat_has_match(cat.id, MatchScope::NotClosed).await? {
                return Err(ServiceError::Conflict("cat is part of a match request".to_string()));
            }
            let updated = uow.update_cat(cat.id, &changes).await?;
            uow.commit().await?;
            Ok(updated)
        })
        .await?;

        info!("User {} updated cat {}", caller_id, cat.id);
        Ok(cat)
    }

    pub async fn delete(&self, caller_id: i64, cat_id: i64) -> Result<i64, ServiceError> {
        with_timeout(self.timeout, "delete cat", async {
            let mut uow = self.store.begin().await?;
            let cat = lock_owned_cat(&mut *uow, caller_id, cat_id).await?;
            if uow.cat_has_match(cat.id, MatchScope::NotClosed).await? {
                return Err(ServiceError::Conflict("cat is part of a match request".to_string()));
            }
            uow.soft_delete_cat(cat.id).await?;
            uow.commit().await?;
            Ok(())
        })
        .await?;

        info!("User {} deleted cat {}", caller_id, cat_id);
        Ok(cat_id)
    }
}

async fn lock_owned_cat(uow: &mut dyn UnitOfWork, caller_id: i64, cat_id: i64) -> Result<Cat, ServiceError> {
    let cat = uow
        .lock_cats(&[cat_id])
        .await?
        .into_iter()
        .find(|c| !c.is_deleted())
        .ok_or_else(|| ServiceError::NotFound("cat not found".to_string()))?;
    if cat.owner_user_id != caller_id {
        return Err(ServiceError::PermissionDenied("cat belongs to another user".to_string()));
    }
    Ok(cat)
}
