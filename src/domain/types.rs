//! Shared domain types.
//!
//! Parameters start life as pipeline-native `(section, name)` entries and are
//! re-addressed by the translation rules before being rendered as sampler
//! declarations. The sampler-side types are serializable so they can be
//! written to the run document and read back when constructing a bridge.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// A flat assignment of parameter name to value for one evaluation.
///
/// Pipeline-side names carry a section separator (`section.key`); cosmology
/// names handled by the host theory engine do not.
pub type ParameterPoint = BTreeMap<String, f64>;

/// Separator between section and key in sampler-side parameter names.
pub const SECTION_SEPARATOR: char = '.';

/// Reference matter density used by the `S8` amplitude convention.
pub const S8_REFERENCE_OMEGAM: f64 = 0.3;

/// Which exploration strategy the sampler framework runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SamplerKind {
    /// Evaluate the likelihood once at the reference point.
    Evaluate,
    /// Markov-chain Monte Carlo.
    Mcmc,
}

/// Which component computes distances and power spectra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TheorySource {
    /// The sampler framework's own theory engine; the pipeline's cosmology
    /// modules are removed.
    Host,
    /// The pipeline computes its own cosmology.
    Pipeline,
}

impl TheorySource {
    pub fn uses_host_theory(self) -> bool {
        self == TheorySource::Host
    }
}

/// A `(section, name)` address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamKey {
    pub section: String,
    pub name: String,
}

impl ParamKey {
    pub fn new(section: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            name: name.into(),
        }
    }

    /// Sampler-side name for a parameter routed to the pipeline.
    pub fn dotted(&self) -> String {
        format!("{}{SECTION_SEPARATOR}{}", self.section, self.name)
    }

    /// Split `section.key` into its parts. Names without a separator are not
    /// pipeline parameters and yield `None`.
    pub fn from_dotted(name: &str) -> Option<Self> {
        let (section, key) = name.split_once(SECTION_SEPARATOR)?;
        if section.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(section, key))
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section, self.name)
    }
}

/// Prior distribution of a sampled parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dist")]
pub enum PriorSpec {
    #[serde(rename = "uniform")]
    Uniform { min: f64, max: f64 },
    #[serde(rename = "norm")]
    Gaussian { loc: f64, scale: f64 },
}

impl PriorSpec {
    /// `true` if `value` lies in the support of the prior.
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            PriorSpec::Uniform { min, max } => min <= value && value <= max,
            PriorSpec::Gaussian { .. } => value.is_finite(),
        }
    }
}

/// Value part of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Fixed(f64),
    Sampled { reference: f64, prior: PriorSpec },
}

/// One declared parameter, with both its pipeline-native address and the
/// address it has after translation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub origin: ParamKey,
    pub target: ParamKey,
    pub value: ParameterValue,
}

impl ParameterEntry {
    pub fn to_spec(&self) -> ParamSpec {
        match self.value {
            ParameterValue::Fixed(v) => ParamSpec::Fixed(v),
            ParameterValue::Sampled { reference, prior } => ParamSpec::Sampled(SampledSpec {
                reference,
                prior,
                drop: None,
            }),
        }
    }
}

/// Sampler-side declaration of a sampled parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledSpec {
    #[serde(rename = "ref")]
    pub reference: f64,
    pub prior: PriorSpec,
    /// Sampled but not passed on to the theory engine (consumed by a transform).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop: Option<bool>,
}

/// How a derived output is declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DerivedOutput {
    /// Computed by the likelihood itself and reported back to the sampler.
    Flag(bool),
    /// Computed from other parameters.
    Transform(DerivedTransform),
}

/// Sampler-side parameter declaration.
///
/// Variant order matters for deserialization: a bare number is fixed, a map
/// with `ref`/`prior` is sampled, a numeric `value` with `drop` is a fixed
/// input hidden from the theory engine, a transform `value` marks an input
/// computed from other parameters, `derived` marks an output, and an empty map requests the
/// quantity from the theory engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Fixed(f64),
    Sampled(SampledSpec),
    FixedDropped { value: f64, drop: bool },
    Computed { value: DerivedTransform },
    Derived { derived: DerivedOutput },
    Requested(RequestedSpec),
}

impl ParamSpec {
    /// A quantity the host theory engine computes and reports (`{}`).
    pub fn requested() -> Self {
        ParamSpec::Requested(RequestedSpec {})
    }
}

/// Empty declaration. Any key in it is a malformed declaration, not a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestedSpec {}

/// Closed set of parameter transforms evaluated by code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transform", rename_all = "snake_case")]
pub enum DerivedTransform {
    /// `output = factor * input`.
    Rescale { input: String, factor: f64 },
    /// `sigma8 = S8 / sqrt(omegam / reference_omegam)`, with `omegam` built
    /// from `ombh2`, `omch2` and `H0`.
    AmplitudeFromS8 { input: String, reference_omegam: f64 },
    /// `S8 = sigma8 * sqrt(omegam / reference_omegam)`.
    DerivedS8 { reference_omegam: f64 },
}

impl ParamSpec {
    /// Hide the parameter from the theory engine while still declaring it.
    pub fn mark_dropped(&mut self) {
        match self {
            ParamSpec::Sampled(spec) => spec.drop = Some(true),
            ParamSpec::Fixed(value) => {
                let value = *value;
                *self = ParamSpec::FixedDropped { value, drop: true };
            }
            ParamSpec::FixedDropped { drop, .. } => *drop = true,
            ParamSpec::Computed { .. } | ParamSpec::Derived { .. } | ParamSpec::Requested(_) => {}
        }
    }
}

impl DerivedTransform {
    pub fn hubble_from_h0() -> Self {
        DerivedTransform::Rescale {
            input: "h0".to_string(),
            factor: 100.0,
        }
    }

    /// Names of the parameters this transform reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            DerivedTransform::Rescale { input, .. } => vec![input.as_str()],
            DerivedTransform::AmplitudeFromS8 { input, .. } => {
                vec![input.as_str(), "ombh2", "omch2", "H0"]
            }
            DerivedTransform::DerivedS8 { .. } => vec!["sigma8", "omegam"],
        }
    }

    /// Inputs absent from `values`.
    pub fn missing_inputs(&self, values: &ParameterPoint) -> Vec<&str> {
        self.inputs()
            .into_iter()
            .filter(|name| !values.contains_key(*name))
            .collect()
    }

    pub fn evaluate(&self, values: &ParameterPoint) -> Result<f64> {
        let get = |name: &str| {
            values
                .get(name)
                .copied()
                .ok_or_else(|| BridgeError::MissingParameter(name.to_string()))
        };

        match self {
            DerivedTransform::Rescale { input, factor } => Ok(get(input)? * factor),
            DerivedTransform::AmplitudeFromS8 {
                input,
                reference_omegam,
            } => {
                let s8 = get(input)?;
                let h = get("H0")? / 100.0;
                let omegam = (get("ombh2")? + get("omch2")?) / (h * h);
                Ok(s8 / (omegam / reference_omegam).sqrt())
            }
            DerivedTransform::DerivedS8 { reference_omegam } => {
                Ok(get("sigma8")? * (get("omegam")? / reference_omegam).sqrt())
            }
        }
    }
}
