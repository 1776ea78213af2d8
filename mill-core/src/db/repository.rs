use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewExtraction, SavedExtraction, UserId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The store cannot order by date because its secondary index is absent.
    #[error("Missing index: {0}")]
    MissingIndex(String),
}

/// Persistence for saved extractions, scoped by owner.
#[async_trait]
pub trait ExtractionRepository: Send + Sync {
    /// Stores a new extraction. The store assigns `id` and `created_at`.
    /// Called at most once per save request.
    async fn append(
        &self,
        extraction: NewExtraction,
    ) -> Result<SavedExtraction, RepositoryError>;

    /// Extractions owned by `user_id`, most recent first, ordered by the store.
    async fn list_by_owner_ordered(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SavedExtraction>, RepositoryError>;

    /// Extractions owned by `user_id` in no particular order.
    async fn list_by_owner(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SavedExtraction>, RepositoryError>;
}
