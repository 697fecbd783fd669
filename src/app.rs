//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the log subscriber
//! - dispatches to the translator or the requirements report

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::bridge::{BridgeSettings, TheoryGrids, requirements_for};
use crate::cli::{Command, RequirementsArgs};
use crate::error::{BridgeError, Result};
use crate::translate::document::{LIKELIHOOD_NAME, SamplerDocument};

pub mod prepare;

/// Entry point for the `cosmobridge` binary.
pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Prepare(args) => prepare::handle_prepare(&args),
        Command::Requirements(args) => handle_requirements(&args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_requirements(args: &RequirementsArgs) -> Result<()> {
    let document = SamplerDocument::load(&args.document)?;
    let settings: &BridgeSettings = &document
        .bridge_block()
        .ok_or_else(|| BridgeError::MissingKey {
            section: "likelihood".to_string(),
            key: LIKELIHOOD_NAME.to_string(),
        })?
        .settings;

    let grids = if settings.use_host_theory {
        Some(TheoryGrids::from_settings(settings)?)
    } else {
        None
    };
    let requirements = requirements_for(settings, grids.as_ref());
    println!("{}", serde_json::to_string_pretty(&requirements)?);
    Ok(())
}
