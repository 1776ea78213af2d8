//! Selecting and opening the history store.
//!
//! The binary registers every backend it was built with. At startup the
//! configured backend name picks one of them, and that factory turns the
//! connection string into a ready [`ExtractionRepository`].

use async_trait::async_trait;
use tracing::{debug, warn};

use super::repository::{ExtractionRepository, RepositoryError};

/// Where an operator's extraction history is kept.
///
/// | backend    | connection_string examples                 |
/// |------------|--------------------------------------------|
/// | `sqlite`   | `mill.db`, `:memory:`, `sqlite:mill.db`    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Backend name as written in config; matched case-insensitively.
    pub backend: String,
    /// Store location. Only the chosen backend interprets it.
    pub connection_string: String,
}

impl DbConfig {
    pub fn new(
        backend: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            connection_string: connection_string.into(),
        }
    }

    /// `backend` trimmed and lowercased, the form factories register under.
    pub fn backend_key(&self) -> String {
        self.backend.trim().to_ascii_lowercase()
    }
}

/// A throwaway in-memory SQLite store.
impl Default for DbConfig {
    fn default() -> Self {
        Self::new("sqlite", ":memory:")
    }
}

/// Opens one kind of history store.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name selected by [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Connects to the store and brings its schema up to date, so the
    /// returned repository can save and list extractions immediately.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ExtractionRepository>, RepositoryError>;
}

/// The history backends compiled into the binary, in registration order.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: Vec<Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `factory`, taking the place of an earlier one with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) -> &mut Self {
        let name = factory.backend_name();
        match self.factories.iter_mut().find(|f| f.backend_name() == name) {
            Some(slot) => {
                warn!(backend = name, "history backend registered twice, keeping the later one");
                *slot = factory;
            }
            None => self.factories.push(factory),
        }
        self
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.backend_name()).collect()
    }

    /// Opens the history store `config` describes.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] when the connection string is
    ///   blank or the backend was not compiled in. No factory runs.
    /// * Whatever the selected factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ExtractionRepository>, RepositoryError> {
        let key = config.backend_key();
        if config.connection_string.trim().is_empty() {
            return Err(RepositoryError::Configuration(format!(
                "no history store location given for backend '{key}'"
            )));
        }

        let factory = self
            .factories
            .iter()
            .find(|f| f.backend_name() == key)
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "history backend '{}' is not available; compiled in: {}",
                    config.backend,
                    self.available_backends().join(", ")
                ))
            })?;

        debug!(backend = factory.backend_name(), "opening history store");
        factory.create(config).await
    }
}
