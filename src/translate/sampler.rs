//! Assembly of the full run document.
//!
//! Given the pipeline definition, its values and priors, and the run options,
//! build the sampler selection, theory-engine arguments, bridge settings and
//! parameter declarations in one pass. Nothing is written here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::bridge::BridgeSettings;
use crate::domain::{
    DerivedOutput, DerivedTransform, ParamKey, ParamSpec, S8_REFERENCE_OMEGAM, SamplerKind,
    TheorySource,
};
use crate::error::{BridgeError, Result};
use crate::ini::SectionedConfig;
use crate::translate::document::{
    LIKELIHOOD_NAME, LikelihoodBlock, SamplerDocument, SamplerSpec, THEORY_ENGINE,
    TheoryEngineSpec,
};
use crate::translate::options::TheoryOptions;
use crate::translate::params::build_parameter_specs;
use crate::translate::rules::COSMOLOGICAL_PARAMETERS;

/// Pipeline modules whose work the host theory engine takes over.
pub const HOST_THEORY_SUPERSEDED_MODULES: [&str; 6] = [
    "sample_S8",
    "sigma8toAs",
    "one_parameter_hmcode",
    "camb",
    "cosmopower",
    "distances",
];

/// Clustering amplitude proxy sampled in place of `sigma8`.
pub const S8_PROXY: &str = "s_8_input";

pub const PIPELINE_SECTION: &str = "pipeline";

/// Run options that do not come from the pipeline files.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    pub pipeline_file: PathBuf,
    pub sampler_output: String,
    pub sampler: SamplerKind,
    pub covmat: Option<PathBuf>,
    pub theory: TheorySource,
    /// Model variant, unless the pipeline's theory section overrides it.
    pub halofit_version: String,
    /// Neutrino mass ordering, unless the pipeline's theory section overrides it.
    pub neutrino_hierarchy: String,
}

/// Build the run document from already-parsed configuration files.
pub fn build_sampler_config(
    pipeline: &SectionedConfig,
    values: &SectionedConfig,
    priors: Option<&SectionedConfig>,
    options: &TranslationOptions,
) -> Result<SamplerDocument> {
    let use_host_theory = options.theory.uses_host_theory();

    let mut settings = BridgeSettings {
        use_host_theory,
        ..BridgeSettings::default()
    };
    let mut halofit_version = options.halofit_version.clone();
    let mut neutrino_hierarchy = options.neutrino_hierarchy.clone();

    if use_host_theory {
        settings.remove_modules = HOST_THEORY_SUPERSEDED_MODULES
            .iter()
            .map(|m| m.to_string())
            .collect();

        let theory_options = TheoryOptions::from_pipeline(pipeline)?;
        for (name, value) in &theory_options.bridge {
            settings.apply_override(name, value)?;
        }
        if let Some(v) = theory_options.theory_str("halofit_version") {
            halofit_version = v.to_string();
        }
        if let Some(v) = theory_options.theory_str("neutrino_hierarchy") {
            neutrino_hierarchy = v.to_string();
        }
    }

    let specs = build_parameter_specs(values, priors, use_host_theory, &halofit_version)?;
    for entry in specs.entries.iter().filter(|e| e.origin != e.target) {
        debug!(from = %entry.origin, to = %entry.target, "Renamed parameter for theory engine");
    }
    info!(
        n_params = specs.entries.len(),
        n_theory = specs.cosmology.len(),
        "Translated parameter declarations"
    );
    let mut cosmology = specs.cosmology;
    let mut pipeline_params = specs.pipeline;

    if use_host_theory {
        add_host_theory_parameters(&mut cosmology);
    }
    pipeline_params.extend(extra_output_parameters(pipeline, use_host_theory)?);

    let theory = use_host_theory.then(|| {
        let mut extra_args = BTreeMap::new();
        extra_args.insert("halofit_version".to_string(), halofit_version);
        extra_args.insert("neutrino_hierarchy".to_string(), neutrino_hierarchy);
        BTreeMap::from([(THEORY_ENGINE.to_string(), TheoryEngineSpec { extra_args })])
    });

    let sampler = match options.sampler {
        SamplerKind::Evaluate => SamplerSpec::Evaluate,
        SamplerKind::Mcmc => SamplerSpec::Mcmc {
            covmat: options.covmat.clone(),
        },
    };

    let likelihood = BTreeMap::from([(
        LIKELIHOOD_NAME.to_string(),
        LikelihoodBlock {
            ini_file: options.pipeline_file.clone(),
            settings,
            params: pipeline_params,
        },
    )]);

    Ok(SamplerDocument {
        debug: false,
        stop_at_error: true,
        timing: true,
        output: options.sampler_output.clone(),
        sampler,
        likelihood,
        theory,
        params: cosmology,
    })
}

/// Transforms and requested quantities the host theory engine needs on top
/// of the declared cosmology parameters.
fn add_host_theory_parameters(cosmology: &mut BTreeMap<String, ParamSpec>) {
    if cosmology.contains_key("h0") {
        cosmology.insert(
            "H0".to_string(),
            ParamSpec::Computed {
                value: DerivedTransform::hubble_from_h0(),
            },
        );
    }

    if let Some(proxy) = cosmology.get_mut(S8_PROXY) {
        proxy.mark_dropped();
    }
    if cosmology.contains_key(S8_PROXY) {
        cosmology.insert(
            "sigma8".to_string(),
            ParamSpec::Computed {
                value: DerivedTransform::AmplitudeFromS8 {
                    input: S8_PROXY.to_string(),
                    reference_omegam: S8_REFERENCE_OMEGAM,
                },
            },
        );
    }

    cosmology.insert("omegam".to_string(), ParamSpec::requested());
    cosmology.insert("As".to_string(), ParamSpec::requested());
    cosmology.insert(
        "s8".to_string(),
        ParamSpec::Derived {
            derived: DerivedOutput::Transform(DerivedTransform::DerivedS8 {
                reference_omegam: S8_REFERENCE_OMEGAM,
            }),
        },
    );
}

/// Derived declarations for the pipeline's `extra_output` entries.
///
/// Vector outputs (`section/key#n`) are skipped, as are cosmology outputs
/// when the host theory engine reports those itself.
pub fn extra_output_parameters(
    pipeline: &SectionedConfig,
    use_host_theory: bool,
) -> Result<BTreeMap<String, ParamSpec>> {
    let mut out = BTreeMap::new();
    let Some(raw) = pipeline.get(PIPELINE_SECTION, "extra_output") else {
        return Ok(out);
    };

    for token in raw.split_whitespace() {
        if token.contains('#') {
            continue;
        }
        let key = match token.split_once('/') {
            Some((section, key)) if !section.is_empty() && !key.is_empty() && !key.contains('/') => {
                ParamKey::new(section, key)
            }
            _ => {
                return Err(BridgeError::MalformedParameterSpec {
                    section: PIPELINE_SECTION.to_string(),
                    name: "extra_output".to_string(),
                    raw: token.to_string(),
                });
            }
        };
        if use_host_theory && key.section == COSMOLOGICAL_PARAMETERS {
            continue;
        }
        out.insert(
            key.dotted(),
            ParamSpec::Derived {
                derived: DerivedOutput::Flag(true),
            },
        );
    }
    Ok(out)
}
