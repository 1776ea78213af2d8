pub mod app;
pub mod auth;
pub mod config;
pub mod export;
pub mod logging;
pub mod render;

pub use app::{App, Outcome, build_registry};
pub use config::AppConfig;
