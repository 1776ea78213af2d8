pub mod auth;
pub mod calculations;
pub mod db;
pub mod history;
pub mod locale;
pub mod models;

pub use auth::{AuthError, AuthOutcome, Authenticator};
pub use db::repository::{ExtractionRepository, RepositoryError};
pub use history::{HistoryError, HistoryService};
pub use locale::{MaskedInput, NumberLocale, ParseError};
pub use models::*;
