pub mod cat;
pub mod cat_match;
pub mod user;

pub use cat::{CatInput, CatService};
pub use cat_match::MatchService;
pub use user::{Session, UserService};

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::filter::FilterError;

/// Outcome taxonomy shared by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    InvalidArgument {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), reason.clone());
        ServiceError::InvalidArgument {
            message: format!("{}: {}", field, reason),
            fields,
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation(constraint) => {
                tracing::warn!("Unique constraint violated: {}", constraint);
                ServiceError::Conflict("Resource already exists".to_string())
            }
            other => {
                tracing::error!("Storage error: {}", other);
                ServiceError::Unavailable(other.to_string())
            }
        }
    }
}

impl From<FilterError> for ServiceError {
    fn from(err: FilterError) -> Self {
        ServiceError::invalid_field(err.field(), err.to_string())
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        tracing::error!("Credential error: {}", err);
        ServiceError::Internal(err.to_string())
    }
}

/// Bound a whole operation, transaction included. Dropping the future on
/// expiry drops its unit of work, which rolls back.
pub(crate) async fn with_timeout<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("{} timed out after {:?}", operation, limit);
            Err(ServiceError::Unavailable(format!("{} timed out", operation)))
        }
    }
}
