//! SQLite-backed history store for saved extractions.

mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::{HISTORY_INDEX, SqliteRepository};
