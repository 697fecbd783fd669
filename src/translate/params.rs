//! Parameter declarations from pipeline values and priors files.
//!
//! A values line holds either one token (fixed value) or three tokens
//! `lower reference upper` (sampled). The prior of a sampled parameter comes
//! from the priors file when it has an entry for the same `(section, name)`,
//! otherwise it is uniform over `[lower, upper]`.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::{ParamKey, ParamSpec, ParameterEntry, ParameterValue, PriorSpec};
use crate::error::{BridgeError, Result};
use crate::ini::SectionedConfig;
use crate::translate::rules::{COSMOLOGICAL_PARAMETERS, translate};

/// Translated parameter declarations, split by who consumes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpecs {
    /// Cosmology parameters handed to the host theory engine, keyed by name.
    pub cosmology: BTreeMap<String, ParamSpec>,
    /// Parameters written into the pipeline's data block, keyed `section.name`.
    pub pipeline: BTreeMap<String, ParamSpec>,
    /// Every parsed entry, in values-file order.
    pub entries: Vec<ParameterEntry>,
}

/// Parse every values line, resolve priors, rename and route the results.
pub fn build_parameter_specs(
    values: &SectionedConfig,
    priors: Option<&SectionedConfig>,
    use_host_theory: bool,
    model_variant: &str,
) -> Result<ParameterSpecs> {
    let mut specs = ParameterSpecs::default();

    for (section, name, raw) in values.entries() {
        let origin = ParamKey::new(section, name);
        let prior_line = priors.and_then(|p| p.get(&origin.section, &origin.name));
        let value = parse_parameter_value(&origin, &raw, prior_line)?;
        // Only a priors-file override can disagree with the reference.
        if let ParameterValue::Sampled { reference, prior } = value {
            if !prior.contains(reference) {
                warn!(parameter = %origin, reference, ?prior, "Reference value outside prior support");
            }
        }
        let target = translate(&origin, model_variant, use_host_theory);

        let entry = ParameterEntry {
            origin,
            target,
            value,
        };
        let spec = entry.to_spec();
        if use_host_theory && entry.target.section == COSMOLOGICAL_PARAMETERS {
            specs.cosmology.insert(entry.target.name.clone(), spec);
        } else {
            specs.pipeline.insert(entry.target.dotted(), spec);
        }
        specs.entries.push(entry);
    }

    Ok(specs)
}

/// Parse one values line, with its optional priors line.
pub fn parse_parameter_value(
    key: &ParamKey,
    raw: &str,
    prior_line: Option<&str>,
) -> Result<ParameterValue> {
    let malformed = || BridgeError::MalformedParameterSpec {
        section: key.section.clone(),
        name: key.name.clone(),
        raw: raw.to_string(),
    };
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    match tokens.as_slice() {
        [value] => Ok(ParameterValue::Fixed(parse_number(value).ok_or_else(malformed)?)),
        [lower, reference, upper] => {
            let lower = parse_number(lower).ok_or_else(malformed)?;
            let reference = parse_number(reference).ok_or_else(malformed)?;
            let upper = parse_number(upper).ok_or_else(malformed)?;
            let prior = match prior_line {
                Some(line) => parse_prior(key, line)?,
                // The bounds are the prior: the reference must lie inside them.
                None if lower <= reference && reference <= upper => PriorSpec::Uniform {
                    min: lower,
                    max: upper,
                },
                None => return Err(malformed()),
            };
            Ok(ParameterValue::Sampled { reference, prior })
        }
        _ => Err(malformed()),
    }
}

/// Parse a priors line: a distribution tag followed by its two parameters.
pub fn parse_prior(key: &ParamKey, line: &str) -> Result<PriorSpec> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let malformed = || BridgeError::MalformedParameterSpec {
        section: key.section.clone(),
        name: key.name.clone(),
        raw: line.to_string(),
    };

    let Some((&tag, rest)) = tokens.split_first() else {
        return Err(malformed());
    };
    let args = || -> Result<(f64, f64)> {
        match rest {
            [a, b, ..] => Ok((
                parse_number(a).ok_or_else(malformed)?,
                parse_number(b).ok_or_else(malformed)?,
            )),
            _ => Err(malformed()),
        }
    };

    match tag {
        "gaussian" => {
            let (loc, scale) = args()?;
            Ok(PriorSpec::Gaussian { loc, scale })
        }
        "uniform" => {
            let (min, max) = args()?;
            Ok(PriorSpec::Uniform { min, max })
        }
        other => Err(BridgeError::UnsupportedPrior {
            tag: other.to_string(),
            section: key.section.clone(),
            name: key.name.clone(),
            raw: line.to_string(),
        }),
    }
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| !v.is_nan())
}
