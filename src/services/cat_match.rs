use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{with_timeout, ServiceError};
use crate::database::models::{Cat, MatchDetail, MatchRequest, NewMatchRequest};
use crate::database::{MatchScope, Store};
use crate::validation;

/// The match workflow: propose, list, approve, reject, cancel.
///
/// Every operation locks cat rows before match rows, always in ascending
/// cat id order, so concurrent operations on overlapping cats serialize
/// instead of deadlocking.
#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl MatchService {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn propose(
        &self,
        issuer_user_id: i64,
        issuer_cat_id: i64,
        receiver_cat_id: i64,
        message: &str,
    ) -> Result<MatchRequest, ServiceError> {
        validation::match_message(message)?;

        let request = with_timeout(self.timeout, "propose match", async {
            let mut uow = self.store.begin().await?;
            let cats = uow.lock_cats(&lock_order(issuer_cat_id, receiver_cat_id)).await?;
            let issuer_cat = live_cat(&cats, issuer_cat_id)?;
            let receiver_cat = live_cat(&cats, receiver_cat_id)?;

            if issuer_cat.sex == receiver_cat.sex {
                return Err(ServiceError::invalid_field("matchCatId", "cats must be of different sex"));
            }
            if issuer_cat.owner_user_id == receiver_cat.owner_user_id {
                return Err(ServiceError::invalid_field("matchCatId", "cats must belong to different owners"));
            }
            if issuer_cat.owner_user_id != issuer_user_id {
                return Err(ServiceError::PermissionDenied("cat belongs to another user".to_string()));
            }
            if issuer_cat.has_matched || receiver_cat.has_matched {
                return Err(ServiceError::Conflict("cat has already matched".to_string()));
            }
            for cat in [issuer_cat, receiver_cat] {
                if uow.cat_has_match(cat.id, MatchScope::Active).await? {
                    return Err(ServiceError::Conflict(format!(
                        "cat {} already has a pending match request",
                        cat.id
                    )));
                }
            }

            let request = uow
                .insert_match(&NewMatchRequest {
                    issuer_user_id,
                    issuer_cat_id,
                    receiver_user_id: receiver_cat.owner_user_id,
                    receiver_cat_id,
                    message: message.to_string(),
                })
                .await?;
            uow.commit().await?;
            Ok(request)
        })
        .await?;

        info!(
            "Match {} proposed: cat {} -> cat {} by user {}",
            request.id, issuer_cat_id, receiver_cat_id, issuer_user_id
        );
        Ok(request)
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<MatchDetail>, ServiceError> {
        with_timeout(self.timeout, "list matches", async {
            let mut uow = self.store.begin().await?;
            Ok(uow.list_matches_for_user(user_id).await?)
        })
        .await
    }

    pub async fn approve(&self, receiver_user_id: i64, match_id: i64) -> Result<i64, ServiceError> {
        let closed = with_timeout(self.timeout, "approve match", async {
            let mut uow = self.store.begin().await?;
            let pending = uow
                .find_match(match_id)
                .await?
                .filter(|m| m.receiver_user_id == receiver_user_id)
                .ok_or_else(match_not_found)?;

            let cat_ids = lock_order(pending.issuer_cat_id, pending.receiver_cat_id);
            uow.lock_cats(&cat_ids).await?;
            let request = uow.lock_match(match_id).await?.ok_or_else(match_not_found)?;
            if !request.is_active() {
                return Err(ServiceError::Conflict("match request is no longer active".to_string()));
            }

            uow.approve_match(match_id).await?;
            let closed = uow.close_matches_for_cats(&cat_ids, match_id).await?;
            uow.mark_cats_matched(&cat_ids).await?;
            uow.commit().await?;
            Ok(closed)
        })
        .await?;

        info!(
            "Match {} approved by user {}, closed {} competing requests",
            match_id, receiver_user_id, closed
        );
        Ok(match_id)
    }

    pub async fn reject(&self, receiver_user_id: i64, match_id: i64) -> Result<i64, ServiceError> {
        with_timeout(self.timeout, "reject match", async {
            let mut uow = self.store.begin().await?;
            let request = uow
                .lock_match(match_id)
                .await?
                .filter(|m| m.receiver_user_id == receiver_user_id)
                .ok_or_else(match_not_found)?;
            if !request.is_active() {
                return Err(ServiceError::Conflict("match request is no longer active".to_string()));
            }
            uow.close_match(match_id).await?;
            uow.commit().await?;
            Ok(())
        })
        .await?;

        info!("Match {} rejected by user {}", match_id, receiver_user_id);
        Ok(match_id)
    }

    pub async fn cancel(&self, issuer_user_id: i64, match_id: i64) -> Result<i64, ServiceError> {
        with_timeout(self.timeout, "cancel match", async {
            let mut uow = self.store.begin().await?;
            let request = uow.lock_match(match_id).await?.ok_or_else(match_not_found)?;
            if request.issuer_user_id != issuer_user_id {
                return Err(ServiceError::PermissionDenied(
                    "only the issuer can cancel a match request".to_string(),
                ));
            }
            if !request.is_active() {
                return Err(ServiceError::Conflict("match request is no longer active".to_string()));
            }
            uow.close_match(match_id).await?;
            uow.commit().await?;
            Ok(())
        })
        .await?;

        info!("Match {} cancelled by user {}", match_id, issuer_user_id);
        Ok(match_id)
    }
}

fn lock_order(a: i64, b: i64) -> Vec<i64> {
    let mut ids = vec![a, b];
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn live_cat(cats: &[Cat], id: i64) -> Result<&Cat, ServiceError> {
    cats.iter()
        .find(|c| c.id == id && !c.is_deleted())
        .ok_or_else(|| ServiceError::NotFound(format!("cat {} not found", id)))
}

fn match_not_found() -> ServiceError {
    ServiceError::NotFound("match request not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{MatchState, Sex};
    use crate::filter::CatQuery;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn same_sex_is_invalid_regardless_of_ownership() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let max = ctx.cat(b, "Max", Sex::Male).await;

        for caller in [a, b] {
            let err = ctx.matches.propose(caller, tom.id, max.id, "hello there").await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument { .. }), "caller {}: {:?}", caller, err);
        }
    }

    #[tokio::test]
    async fn propose_checks_existence_then_ownership() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let c = ctx.user("c@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;

        let err = ctx.matches.propose(a, tom.id, 9999, "hello there").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = ctx.matches.propose(c, tom.id, kitty.id, "hello there").await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let err = ctx.matches.propose(a, tom.id, kitty.id, "hey").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn own_cats_cannot_match_each_other() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(a, "Kitty", Sex::Female).await;

        let err = ctx.matches.propose(a, tom.id, kitty.id, "hello there").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn cat_with_active_request_cannot_be_proposed_again() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let c = ctx.user("c@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;
        let luna = ctx.cat(c, "Luna", Sex::Female).await;

        ctx.matches.propose(a, tom.id, kitty.id, "hello there").await.unwrap();
        let err = ctx.matches.propose(a, tom.id, luna.id, "hello again").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn approval_closes_competitors_and_marks_cats() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let c = ctx.user("c@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;
        let leo = ctx.cat(c, "Leo", Sex::Male).await;
        let luna = ctx.cat(c, "Luna", Sex::Female).await;

        let chosen = ctx.matches.propose(a, tom.id, kitty.id, "hello there").await.unwrap();
        // A competing request towards the issuer's cat from someone else.
        let competing = ctx.matches.propose(c, luna.id, tom.id, "pick me please").await;
        assert!(competing.is_err(), "tom already has an active request");
        let unrelated = ctx.matches.propose(c, leo.id, kitty.id, "hi kitty cat").await;
        assert!(unrelated.is_err(), "kitty already has an active request");

        ctx.matches.approve(b, chosen.id).await.unwrap();

        let requests = ctx.all_matches().await;
        let approved = requests.iter().find(|m| m.id == chosen.id).unwrap();
        assert_eq!(approved.state(), MatchState::Approved);
        for id in [tom.id, kitty.id] {
            assert!(ctx.cat_by_id(id).await.has_matched);
        }

        let err = ctx.matches.propose(c, luna.id, tom.id, "hello there").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn approval_closes_requests_made_before_it() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let c = ctx.user("c@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;
        let leo = ctx.cat(c, "Leo", Sex::Male).await;

        // Seed two active requests on kitty directly, as if an older
        // deployment had let them both through.
        let first = ctx.insert_match(a, tom.id, b, kitty.id).await;
        let second = ctx.insert_match(c, leo.id, b, kitty.id).await;

        ctx.matches.approve(b, first.id).await.unwrap();

        let requests = ctx.all_matches().await;
        let state = |id| requests.iter().find(|m| m.id == id).unwrap().state();
        assert_eq!(state(first.id), MatchState::Approved);
        assert_eq!(state(second.id), MatchState::Closed);
        assert!(!ctx.cat_by_id(leo.id).await.has_matched);
    }

    #[tokio::test]
    async fn only_receiver_can_approve_or_reject() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;
        let request = ctx.matches.propose(a, tom.id, kitty.id, "hello there").await.unwrap();

        assert!(matches!(ctx.matches.approve(a, request.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(ctx.matches.reject(a, request.id).await, Err(ServiceError::NotFound(_))));

        ctx.matches.reject(b, request.id).await.unwrap();
        assert!(matches!(ctx.matches.approve(b, request.id).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(ctx.matches.reject(b, request.id).await, Err(ServiceError::Conflict(_))));

        // Rejection frees both cats.
        ctx.matches.propose(a, tom.id, kitty.id, "second try").await.unwrap();
    }

    #[tokio::test]
    async fn cancel_by_non_issuer_leaves_request_active() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;
        let request = ctx.matches.propose(a, tom.id, kitty.id, "hello there").await.unwrap();

        let err = ctx.matches.cancel(b, request.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
        let requests = ctx.all_matches().await;
        assert_eq!(requests[0].state(), MatchState::Active);

        ctx.matches.cancel(a, request.id).await.unwrap();
        assert!(matches!(ctx.matches.cancel(a, request.id).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(ctx.matches.cancel(a, 4242).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn racing_proposals_admit_exactly_one() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;

        let handles = (0..8).map(|i| {
            let matches = ctx.matches.clone();
            let (tom_id, kitty_id) = (tom.id, kitty.id);
            tokio::spawn(async move {
                matches.propose(a, tom_id, kitty_id, &format!("hello there {}", i)).await
            })
        });

        let mut ok = 0;
        for outcome in futures::future::join_all(handles).await {
            match outcome.unwrap() {
                Ok(_) => ok += 1,
                Err(ServiceError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(ctx.all_matches().await.len(), 1);
    }

    #[tokio::test]
    async fn list_is_scoped_to_caller_and_newest_first() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let c = ctx.user("c@example.com").await;
        let tom = ctx.cat(a, "Tom", Sex::Male).await;
        let kitty = ctx.cat(b, "Kitty", Sex::Female).await;
        let leo = ctx.cat(c, "Leo", Sex::Male).await;
        let luna = ctx.cat(c, "Luna", Sex::Female).await;

        let first = ctx.matches.propose(a, tom.id, luna.id, "hello luna").await.unwrap();
        let second = ctx.matches.propose(c, leo.id, kitty.id, "hello kitty").await.unwrap();

        let for_c = ctx.matches.list(c).await.unwrap();
        assert_eq!(
            for_c.iter().map(|d| d.request.id).collect::<Vec<_>>(),
            [second.id, first.id]
        );

        let for_a = ctx.matches.list(a).await.unwrap();
        assert_eq!(for_a.len(), 1);
        let detail = &for_a[0];
        assert_eq!(detail.issuer.email, "a@example.com");
        assert_eq!(detail.receiver.email, "c@example.com");
        assert_eq!(detail.issuer_cat.id, tom.id);
        assert_eq!(detail.receiver_cat.id, luna.id);

        ctx.matches.cancel(a, first.id).await.unwrap();
        assert!(ctx.matches.list(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scenario_propose_approve_list_then_conflict() {
        let ctx = TestContext::new();
        let a = ctx.user("a@example.com").await;
        let b = ctx.user("b@example.com").await;
        let c = ctx.user("c@example.com").await;
        let cat_a = ctx.cat(a, "Alpha", Sex::Male).await;
        let cat_b = ctx.cat(b, "Bravo", Sex::Female).await;
        let cat_c = ctx.cat(c, "Charlie", Sex::Female).await;

        let request = ctx.matches.propose(a, cat_a.id, cat_b.id, "hello there").await.unwrap();
        ctx.matches.approve(b, request.id).await.unwrap();

        for owner in [a, b] {
            let listed = ctx.matches.list(owner).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert!(listed[0].request.status);
        }

        let err = ctx.matches.propose(a, cat_a.id, cat_c.id, "hello there").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let matched = ctx
            .cats
            .list(a, &CatQuery { has_matched: Some("true".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(matched.len(), 2);
    }
}
