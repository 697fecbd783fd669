//! Quantities the bridge asks the sampler's theory engine for.

use serde::Serialize;

/// Scalar parameters read at every evaluation.
pub const REQUIRED_PARAMS: [&str; 4] = ["H0", "omegam", "omch2", "ombh2"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSpectrumRequirement {
    /// Redshifts, highest first.
    pub z: Vec<f64>,
    pub vars_pairs: Vec<[String; 2]>,
    pub k_max: f64,
    /// Linear and nonlinear.
    pub nonlinear: [bool; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceRequirement {
    pub z: Vec<f64>,
}

/// Everything the bridge needs per evaluation. Empty when the pipeline
/// computes its own cosmology.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Requirements {
    pub params: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pk_interpolator: Option<PowerSpectrumRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comoving_radial_distance: Option<DistanceRequirement>,
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
            && self.pk_interpolator.is_none()
            && self.comoving_radial_distance.is_none()
    }
}
