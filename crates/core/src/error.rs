use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LogisticsError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Reference(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LogisticsError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn reference(message: impl Into<String>) -> Self {
        Self::Reference(message.into())
    }
}

impl From<serde_json::Error> for LogisticsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(StoreError::Serialization(err))
    }
}

pub type LogisticsResult<T> = std::result::Result<T, LogisticsError>;
