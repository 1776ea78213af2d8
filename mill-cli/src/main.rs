use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use mill_cli::config::{AppConfig, CliOverrides};
use mill_cli::{App, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Flour mill extraction yield calculator.
///
/// Projects 10-second flour and bran samples to hourly rates, reports the
/// flour yield, and keeps a per-operator history of saved results.
#[derive(Debug, Parser)]
#[command(name = "mill", version)]
struct Cli {
    /// Configuration file. Defaults to `mill.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History store backend.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// History store connection string.
    /// For SQLite this is a file path (e.g. `mill.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Operator id; skips the sign-in prompt.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Log filter, e.g. `debug` or `info,mill_db_sqlite=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Hide log output on the console.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute hourly rates and yield from two samples.
    Calc {
        /// Flour sample weight, e.g. `1,50`.
        #[arg(long, allow_hyphen_values = true)]
        flour: String,

        /// Bran sample weight, e.g. `0,50`.
        #[arg(long, allow_hyphen_values = true)]
        bran: String,

        /// Save the result to the signed-in operator's history.
        #[arg(long)]
        save: bool,
    },

    /// Replay keystrokes through the masked sample field (`<` deletes).
    Mask { keys: String },

    /// List the signed-in operator's saved extractions.
    History,

    /// Write the signed-in operator's history as CSV.
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
}

// ─── configuration ───────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    config.apply_cli(&CliOverrides {
        backend: cli.backend.clone(),
        db: cli.db.clone(),
        user: cli.user.clone(),
        log_level: cli.log_level.clone(),
    });
    Ok(config)
}

/// `RUST_LOG` wins over the configured level unless `--log-level` is given.
fn apply_logging(
    cli: &Cli,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if cli.log_level.is_some() || !logging::env_filter_is_set() {
        logging::set_log_level(&config.logging.level)?;
    }
    if cli.quiet {
        logging::set_console_enabled(false)?;
    }
    if let Some(path) = &config.logging.file {
        logging::enable_file_logging(path)?;
    }
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli).context("loading configuration")?;
    if let Err(e) = apply_logging(&cli, &config) {
        warn!(error = %e, "logging setup incomplete");
    }

    debug!(
        backend = %config.database.backend,
        locale = %config.display.locale,
        "configuration resolved"
    );

    let app = App::new(config);
    let mut stdout = std::io::stdout().lock();
    let outcome = match &cli.command {
        Command::Calc { flour, bran, save } => {
            app.calculate(flour, bran, *save, &mut stdout).await?
        }
        Command::Mask { keys } => app.mask(keys, &mut stdout)?,
        Command::History => app.history(&mut stdout).await?,
        Command::Export { output } => app.export(output, &mut stdout).await?,
    };

    Ok(outcome.exit_code())
}
