use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::models::{Cat, MatchRequest, NewMatchRequest, NewUser, Sex};
use crate::database::{MemoryStore, Store};
use crate::services::{CatInput, CatService, MatchService, UserService};

/// Services wired to a fresh in-memory store, plus shortcuts for seeding it.
pub struct TestContext {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub users: UserService,
    pub cats: CatService,
    pub matches: MatchService,
}

impl TestContext {
    pub fn new() -> Self {
        let config = AppConfig::development();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let tokens = TokenService::from_config(&config.security);
        let timeout = config.query_timeout();

        Self {
            users: UserService::new(store.clone(), tokens.clone(), timeout),
            cats: CatService::new(store.clone(), config.filter.clone(), timeout),
            matches: MatchService::new(store.clone(), timeout),
            tokens,
            store,
        }
    }

    /// Insert a user directly, skipping password hashing. Returns the user id.
    pub async fn user(&self, email: &str) -> i64 {
        let mut uow = self.store.begin().await.unwrap();
        let user = uow
            .insert_user(&NewUser {
                email: email.to_string(),
                name: "Test User".to_string(),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        user.id
    }

    pub fn cat_input(name: &str, sex: Sex) -> CatInput {
        CatInput {
            name: name.to_string(),
            race: "Persian".to_string(),
            sex: sex.as_str().to_string(),
            age_in_month: 12,
            description: format!("{} likes naps", name),
            image_urls: vec![format!("https://example.com/{}.jpg", name.to_lowercase())],
        }
    }

    pub async fn cat(&self, owner: i64, name: &str, sex: Sex) -> Cat {
        self.cats.create(owner, &Self::cat_input(name, sex)).await.unwrap()
    }

    pub async fn cat_by_id(&self, id: i64) -> Cat {
        let mut uow = self.store.begin().await.unwrap();
        uow.find_cat(id).await.unwrap().unwrap()
    }

    /// Insert an active request without any workflow checks.
    pub async fn insert_match(&self, issuer: i64, issuer_cat: i64, receiver: i64, receiver_cat: i64) -> MatchRequest {
        let mut uow = self.store.begin().await.unwrap();
        let request = uow
            .insert_match(&NewMatchRequest {
                issuer_user_id: issuer,
                issuer_cat_id: issuer_cat,
                receiver_user_id: receiver,
                receiver_cat_id: receiver_cat,
                message: "seeded request".to_string(),
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        request
    }

    /// Every stored match request, closed ones included. Ids are dense in
    /// the memory store.
    pub async fn all_matches(&self) -> Vec<MatchRequest> {
        let mut uow = self.store.begin().await.unwrap();
        let mut all = Vec::new();
        let mut id = 1;
        while let Some(request) = uow.find_match(id).await.unwrap() {
            all.push(request);
            id += 1;
        }
        all
    }
}
