use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::{with_timeout, ServiceError};
use crate::auth::{hash_password, verify_password, TokenService};
use crate::database::models::{NewUser, User};
use crate::database::Store;
use crate::validation;

/// What a successful register or login hands back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip)]
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    timeout: Duration,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, timeout: Duration) -> Self {
        Self { store, tokens, timeout }
    }

    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<Session, ServiceError> {
        validation::registration(email, name, password)?;

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;

        let user = with_timeout(self.timeout, "register", async {
            let mut uow = self.store.begin().await?;
            if uow.find_user_by_email(email).await?.is_some() {
                return Err(ServiceError::Conflict("email already registered".to_string()));
            }
            let user = uow
                .insert_user(&NewUser {
                    email: email.to_string(),
                    name: name.to_string(),
                    password_hash,
                })
                .await?;
            uow.commit().await?;
            Ok(user)
        })
        .await?;

        info!("Registered user {}", user.id);
        self.session(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        validation::login(email, password)?;

        let user = with_timeout(self.timeout, "login", async {
            let mut uow = self.store.begin().await?;
            Ok(uow.find_user_by_email(email).await?)
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound("user not found".to_string()))?;

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        if !valid {
            warn!("Failed login for user {}", user.id);
            return Err(ServiceError::invalid_field("password", "invalid password"));
        }

        self.session(&user)
    }

    fn session(&self, user: &User) -> Result<Session, ServiceError> {
        Ok(Session {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            access_token: self.tokens.issue(user.id, &user.email)?,
        })
    }
}
