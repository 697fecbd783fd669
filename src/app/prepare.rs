//! `cosmobridge prepare`: read the pipeline files, build the run document,
//! write it.
//!
//! Every file is parsed and the whole document assembled before anything is
//! written, so a configuration error never leaves a partial document behind.

use std::path::PathBuf;

use tracing::info;

use crate::cli::PrepareArgs;
use crate::error::Result;
use crate::ini::SectionedConfig;
use crate::translate::sampler::{PIPELINE_SECTION, TranslationOptions, build_sampler_config};

pub fn handle_prepare(args: &PrepareArgs) -> Result<()> {
    let pipeline = SectionedConfig::load(&args.pipeline_file)?;

    let values_path = match &args.values_file {
        Some(path) => path.clone(),
        None => {
            info!("--values-file not specified, reading from pipeline configuration");
            PathBuf::from(pipeline.require(PIPELINE_SECTION, "values")?.trim())
        }
    };
    let values = SectionedConfig::load(&values_path)?;

    let priors = match resolve_priors_path(args.priors_file.as_ref(), &pipeline) {
        Some(path) => Some(SectionedConfig::load(&path)?),
        None => None,
    };

    let options = TranslationOptions {
        pipeline_file: args.pipeline_file.clone(),
        sampler_output: args.sampler_output_path.clone(),
        sampler: args.sampler,
        covmat: args.covmat.clone(),
        theory: args.boltzmann_code,
        halofit_version: args.halofit_version.clone(),
        neutrino_hierarchy: args.neutrino_hierarchy.clone(),
    };
    let document = build_sampler_config(&pipeline, &values, priors.as_ref(), &options)?;
    document.write(&args.output_yaml_file)
}

/// Priors file: the explicit flag, else `[pipeline] priors`. A missing or
/// blank `priors` option means no priors file.
pub fn resolve_priors_path(explicit: Option<&PathBuf>, pipeline: &SectionedConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.clone());
    }
    info!("--priors-file not specified, reading from pipeline configuration");
    match pipeline.get(PIPELINE_SECTION, "priors").map(str::trim) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => {
            info!("No priors file configured, using uniform priors from the values file");
            None
        }
    }
}
