use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),
}

impl FilterError {
    /// Query parameter the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidParameter { name, .. } => name,
            FilterError::InvalidLimit(_) => "limit",
            FilterError::InvalidOffset(_) => "offset",
        }
    }
}
