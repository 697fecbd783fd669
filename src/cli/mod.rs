//! Command-line parsing.
//!
//! Every path flag can also be supplied through the environment (or a `.env`
//! file), which is convenient on batch systems where the same job script is
//! reused across runs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{SamplerKind, TheorySource};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cosmobridge",
    version,
    about = "Run a sectioned likelihood pipeline inside a sampler framework"
)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate a pipeline configuration into a sampler run document.
    Prepare(PrepareArgs),
    /// Print the quantities a run document asks the theory engine for.
    Requirements(RequirementsArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct PrepareArgs {
    /// Pipeline definition (INI).
    #[arg(long, env = "COSMOBRIDGE_PIPELINE_FILE")]
    pub pipeline_file: PathBuf,

    /// Parameter values file. Defaults to `[pipeline] values`.
    #[arg(long, env = "COSMOBRIDGE_VALUES_FILE")]
    pub values_file: Option<PathBuf>,

    /// Parameter priors file. Defaults to `[pipeline] priors`, if set.
    #[arg(long, env = "COSMOBRIDGE_PRIORS_FILE")]
    pub priors_file: Option<PathBuf>,

    /// Where to write the run document (`.json` for JSON, YAML otherwise).
    #[arg(long, env = "COSMOBRIDGE_OUTPUT_FILE")]
    pub output_yaml_file: PathBuf,

    /// Output prefix for the sampler's chains.
    #[arg(long, env = "COSMOBRIDGE_SAMPLER_OUTPUT")]
    pub sampler_output_path: String,

    /// Nonlinear/feedback model variant.
    #[arg(long, default_value = "mead2020_feedback")]
    pub halofit_version: String,

    /// Neutrino mass ordering passed to the theory engine.
    #[arg(long, default_value = "normal")]
    pub neutrino_hierarchy: String,

    /// Which component computes distances and power spectra.
    #[arg(long, value_enum, default_value_t = TheorySource::Host)]
    pub boltzmann_code: TheorySource,

    #[arg(long, value_enum, default_value_t = SamplerKind::Evaluate)]
    pub sampler: SamplerKind,

    /// Proposal covariance matrix for `--sampler mcmc`.
    #[arg(long = "covmat", alias = "sampler.mcmc.covmat", value_name = "PATH")]
    pub covmat: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct RequirementsArgs {
    /// Run document written by `cosmobridge prepare`.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
}
