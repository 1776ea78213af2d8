//! Command handlers behind the `mill` binary.
//!
//! Handlers write operator-facing text to the supplied writer. Validation
//! problems end the command with [`Outcome::Rejected`]; sign-in and storage
//! problems are reported and the command still completes.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use mill_core::calculations::{CalculationError, YieldCalculator};
use mill_core::db::RepositoryRegistry;
use mill_core::{
    AuthOutcome, Authenticator, CalculationResult, ExtractionRepository, HistoryError,
    HistoryService, Identity, MaskedInput, NumberLocale, ParseError, RepositoryError, SampleInput,
    SavedExtraction,
};
use mill_db_sqlite::SqliteRepositoryFactory;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::auth;
use crate::config::AppConfig;
use crate::export;
use crate::render;

/// Mask keystroke that deletes the last digit.
pub const BACKSPACE_KEY: char = '<';

/// Build the repository registry with every compiled-in backend.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The operator's input was refused; nothing was computed or stored.
    Rejected,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Completed => ExitCode::SUCCESS,
            Self::Rejected => ExitCode::from(2),
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid {field} sample: {source}")]
    Parse {
        field: &'static str,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Calculation(#[from] CalculationError),
}

impl InputError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse { field, source } => {
                format!("'{}' is not a valid {field} sample weight.", source.input())
            }
            Self::Calculation(e) => e.user_message(),
        }
    }
}

pub struct App {
    config: AppConfig,
    registry: RepositoryRegistry,
    authenticator: Box<dyn Authenticator>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let authenticator = auth::from_settings(&config.auth);
        Self::with_authenticator(config, authenticator)
    }

    pub fn with_authenticator(
        config: AppConfig,
        authenticator: Box<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            registry: build_registry(),
            authenticator,
        }
    }

    fn locale(&self) -> NumberLocale {
        self.config.display.locale
    }

    /// Parses both sample fields and computes the result.
    pub fn evaluate(
        &self,
        flour: &str,
        bran: &str,
    ) -> Result<(SampleInput, CalculationResult), InputError> {
        let locale = self.locale();
        let parse = |field: &'static str, text: &str| {
            locale
                .parse_decimal(text)
                .map_err(|source| InputError::Parse { field, source })
        };
        let sample = SampleInput::new(parse("flour", flour)?, parse("bran", bran)?);
        let result = YieldCalculator::new(self.config.calculation.zero_samples).calculate(&sample)?;
        Ok((sample, result))
    }

    /// `mill calc`: print the result cards and, if asked, save them.
    pub async fn calculate<W: Write>(
        &self,
        flour: &str,
        bran: &str,
        save: bool,
        out: &mut W,
    ) -> anyhow::Result<Outcome> {
        let (sample, result) = match self.evaluate(flour, bran) {
            Ok(evaluated) => evaluated,
            Err(e) => {
                warn!(flour, bran, error = %e, "rejected sample input");
                writeln!(out, "{}", e.user_message())?;
                return Ok(Outcome::Rejected);
            }
        };

        let locale = self.locale();
        write!(out, "{}", render::result_cards(locale, &result))?;
        writeln!(out)?;
        write!(out, "{}", render::distribution(locale, &result))?;

        if !save {
            return Ok(Outcome::Completed);
        }

        let Some(identity) = self.sign_in(out).await? else {
            return Ok(Outcome::Completed);
        };

        let saved = match self.open_store().await {
            Ok(store) => {
                HistoryService::new(store.as_ref())
                    .save(&identity, &sample, &result)
                    .await
            }
            Err(e) => Err(HistoryError::Save(e)),
        };
        match saved {
            Ok(entry) => writeln!(out, "\nSaved extraction #{} for {}.", entry.id, identity.label())?,
            Err(e) => writeln!(out, "\n{}", e.user_message())?,
        }
        Ok(Outcome::Completed)
    }

    /// `mill mask`: replays keystrokes and prints the field after each one.
    pub fn mask<W: Write>(
        &self,
        keys: &str,
        out: &mut W,
    ) -> anyhow::Result<Outcome> {
        let mut field = MaskedInput::new(self.locale());
        for key in keys.chars() {
            let shown = if key == BACKSPACE_KEY {
                field.backspace()
            } else {
                field.push(key)
            };
            writeln!(out, "{key} -> {shown}")?;
        }

        let value = field.value().context("masked field holds an unparseable value")?;
        writeln!(out, "value: {value}")?;
        Ok(Outcome::Completed)
    }

    /// `mill history`: the signed-in operator's extractions, newest first.
    pub async fn history<W: Write>(
        &self,
        out: &mut W,
    ) -> anyhow::Result<Outcome> {
        let Some(identity) = self.sign_in(out).await? else {
            writeln!(out, "Sign in to see saved extractions.")?;
            return Ok(Outcome::Completed);
        };

        let records = match self.load_history(&identity).await {
            Ok(records) => records,
            Err(e) => {
                writeln!(out, "{}", e.user_message())?;
                return Ok(Outcome::Completed);
            }
        };

        if records.is_empty() {
            writeln!(out, "No extractions saved yet. Use `mill calc --save` to add one.")?;
            return Ok(Outcome::Completed);
        }

        writeln!(out, "History for {}", identity.label())?;
        let locale = self.locale();
        for entry in &records {
            writeln!(out)?;
            write!(out, "{}", render::history_entry(locale, entry, &Local))?;
        }
        Ok(Outcome::Completed)
    }

    /// `mill export`: writes the signed-in operator's history to `path`.
    pub async fn export<W: Write>(
        &self,
        path: &Path,
        out: &mut W,
    ) -> anyhow::Result<Outcome> {
        let Some(identity) = self.sign_in(out).await? else {
            writeln!(out, "Sign in to export saved extractions.")?;
            return Ok(Outcome::Completed);
        };

        let records = match self.load_history(&identity).await {
            Ok(records) => records,
            Err(e) => {
                writeln!(out, "{}", e.user_message())?;
                return Ok(Outcome::Completed);
            }
        };

        let written = export::export_to_file(path, &records)
            .with_context(|| format!("exporting history to {}", path.display()))?;
        info!(user_id = %identity.user_id, rows = written, path = %path.display(), "exported history");
        writeln!(out, "Exported {written} extraction(s) to {}.", path.display())?;
        Ok(Outcome::Completed)
    }

    /// Runs the sign-in flow. Failures are reported to the operator and
    /// yield `None`, as does a cancelled sign-in.
    async fn sign_in<W: Write>(
        &self,
        out: &mut W,
    ) -> anyhow::Result<Option<Identity>> {
        match self.authenticator.authenticate().await {
            Ok(AuthOutcome::Authenticated(identity)) => Ok(Some(identity)),
            Ok(AuthOutcome::Cancelled) => {
                debug!("sign-in cancelled by operator");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                writeln!(out, "{}", e.user_message())?;
                Ok(None)
            }
        }
    }

    async fn open_store(&self) -> Result<Box<dyn ExtractionRepository>, RepositoryError> {
        let db_config = self.config.db_config();
        debug!(backend = %db_config.backend, "opening history store");
        self.registry.create(&db_config).await.inspect_err(|e| {
            error!(backend = %db_config.backend, error = %e, "cannot open history store");
        })
    }

    async fn load_history(
        &self,
        identity: &Identity,
    ) -> Result<Vec<SavedExtraction>, HistoryError> {
        let store = self
            .open_store()
            .await
            .map_err(HistoryError::Unavailable)?;
        HistoryService::new(store.as_ref())
            .query_by_owner(identity)
            .await
    }
}

#[cfg(test)]
mod tests {
    use mill_core::AuthError;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::{ConsoleAuthenticator, StaticAuthenticator};
    use crate::config::AuthSettings;

    fn config(connection_string: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.connection_string = connection_string.to_string();
        config
    }

    fn app_for(
        config: AppConfig,
        user: &str,
    ) -> App {
        let authenticator = StaticAuthenticator::new(AuthSettings::default(), Identity::new(user));
        App::with_authenticator(config, Box::new(authenticator))
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn calculate_prints_cards_and_distribution() {
        let app = app_for(config(":memory:"), "alice");
        let mut out = Vec::new();

        let outcome = app.calculate("1,50", "0,50", false, &mut out).await.unwrap();

        let out = text(out);
        assert_eq!(outcome, Outcome::Completed);
        assert!(out.contains("Flour per hour"));
        assert!(out.contains("540 kg/h"));
        assert!(out.contains("720 kg/h"));
        assert!(out.contains("75%"));
        assert!(out.contains("Distribution"));
    }

    #[tokio::test]
    async fn negative_sample_is_rejected() {
        let app = app_for(config(":memory:"), "alice");
        let mut out = Vec::new();

        let outcome = app.calculate("-1", "0,50", true, &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(text(out), "Sample values cannot be negative.\n");
    }

    #[tokio::test]
    async fn unparseable_sample_names_the_field() {
        let app = app_for(config(":memory:"), "alice");
        let mut out = Vec::new();

        let outcome = app.calculate("1,50", "abc", false, &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(text(out), "'abc' is not a valid bran sample weight.\n");
    }

    #[tokio::test]
    async fn zero_samples_follow_policy() {
        let mut strict = config(":memory:");
        strict.calculation.zero_samples = mill_core::calculations::ZeroSamplePolicy::Reject;

        let mut out = Vec::new();
        let outcome = app_for(strict, "alice")
            .calculate("", "", false, &mut out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Rejected);

        let mut out = Vec::new();
        let outcome = app_for(config(":memory:"), "alice")
            .calculate("", "", false, &mut out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert!(text(out).contains("Flour yield"));
    }

    #[tokio::test]
    async fn saved_extraction_shows_up_in_history_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("mill.db");
        let app = app_for(config(db.to_str().unwrap()), "alice");

        let mut out = Vec::new();
        app.calculate("1,50", "0,50", true, &mut out).await.unwrap();
        assert!(text(out).contains("Saved extraction #1 for alice."));

        let mut out = Vec::new();
        app.history(&mut out).await.unwrap();
        let out = text(out);
        assert!(out.starts_with("History for alice\n"));
        assert!(out.contains("[75,0%]"));
        assert!(out.contains("Flour 540 kg/h   Bran 180 kg/h"));

        let csv_path = dir.path().join("history.csv");
        let mut out = Vec::new();
        app.export(&csv_path, &mut out).await.unwrap();
        assert!(text(out).starts_with("Exported 1 extraction(s)"));
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().ends_with(",1.50,0.50,540,180,75"));
    }

    #[tokio::test]
    async fn history_is_scoped_to_the_signed_in_operator() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("mill.db");
        let conn = db.to_str().unwrap();

        app_for(config(conn), "alice")
            .calculate("1,50", "0,50", true, &mut Vec::<u8>::new())
            .await
            .unwrap();

        let mut out = Vec::new();
        app_for(config(conn), "bob").history(&mut out).await.unwrap();

        assert!(text(out).starts_with("No extractions saved yet."));
    }

    #[tokio::test]
    async fn cancelled_sign_in_skips_the_store() {
        let mut broken = config(":memory:");
        broken.database.backend = "postgres".to_string();
        let console = ConsoleAuthenticator::new(AuthSettings::default(), "\n".as_bytes());
        let app = App::with_authenticator(broken, Box::new(console));

        let mut out = Vec::new();
        app.history(&mut out).await.unwrap();

        assert_eq!(text(out), "Sign in to see saved extractions.\n");
    }

    #[tokio::test]
    async fn unavailable_store_reports_generic_save_failure() {
        let mut broken = config(":memory:");
        broken.database.backend = "postgres".to_string();
        let app = app_for(broken, "alice");
        let mut out = Vec::new();

        let outcome = app.calculate("1,50", "0,50", true, &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert!(text(out).ends_with("\nCould not save the extraction. Please try again.\n"));
    }

    #[tokio::test]
    async fn unavailable_store_means_no_history() {
        let mut broken = config(":memory:");
        broken.database.backend = "postgres".to_string();
        let mut out = Vec::new();

        app_for(broken, "alice").history(&mut out).await.unwrap();

        assert_eq!(text(out), "No history available.\n");
    }

    #[tokio::test]
    async fn unknown_backend_is_reported_as_unavailable_store() {
        let mut broken = config(":memory:");
        broken.database.backend = "postgres".to_string();
        let app = app_for(broken, "alice");

        let err = app.load_history(&Identity::new("alice")).await.unwrap_err();

        assert!(matches!(
            err,
            HistoryError::Unavailable(RepositoryError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn disabled_sign_in_is_explained() {
        let settings = AuthSettings {
            enabled: false,
            ..AuthSettings::default()
        };
        let authenticator = StaticAuthenticator::new(settings, Identity::new("alice"));
        let app = App::with_authenticator(config(":memory:"), Box::new(authenticator));
        let mut out = Vec::new();

        app.history(&mut out).await.unwrap();

        let out = text(out);
        assert!(out.starts_with(&AuthError::MethodDisabled.user_message()));
        assert!(out.ends_with("Sign in to see saved extractions.\n"));
    }

    #[test]
    fn mask_replays_keystrokes() {
        let app = app_for(config(":memory:"), "alice");
        let mut out = Vec::new();

        app.mask("12345<", &mut out).unwrap();

        assert_eq!(
            text(out),
            "1 -> 0,01\n\
             2 -> 0,12\n\
             3 -> 1,23\n\
             4 -> 12,34\n\
             5 -> 123,45\n\
             < -> 12,34\n\
             value: 12.34\n"
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Completed.exit_code(), ExitCode::SUCCESS);
        assert_eq!(Outcome::Rejected.exit_code(), ExitCode::from(2));
    }
}
