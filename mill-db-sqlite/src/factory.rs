use async_trait::async_trait;
use mill_core::db::{DbConfig, RepositoryFactory};
use mill_core::{ExtractionRepository, RepositoryError};

use crate::repository::SqliteRepository;

/// Map a connection string onto a sqlx SQLite URL.
///
/// * `":memory:"` becomes an in-memory database.
/// * A string already starting with `sqlite:` is used unchanged.
/// * Anything else is treated as a file path, created if missing.
pub fn database_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else {
        format!("sqlite:{trimmed}?mode=rwc")
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`mill_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use mill_core::db::RepositoryRegistry;
/// use mill_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ExtractionRepository>, RepositoryError> {
        let url = database_url(&config.connection_string);
        let repo = SqliteRepository::new(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        tracing::info!(url = %url, "opened sqlite history store");
        Ok(Box::new(repo))
    }
}
