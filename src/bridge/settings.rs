//! Construction arguments of the runtime bridge.
//!
//! These are the fields of the likelihood block in the run document. Every
//! field has a default so a document only needs to name what it overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::translate::options::OptionValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Pipeline modules superseded by the host theory engine.
    pub remove_modules: Vec<String>,
    /// Take distances and power spectra from the sampler's theory engine.
    pub use_host_theory: bool,
    /// Persist every evaluated data block to this directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_datablock_path: Option<PathBuf>,

    pub kmin_extrapolate: f64,
    pub kmax: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kmax_extrapolate: Option<f64>,
    pub nk: usize,

    pub zmin: f64,
    pub zmax: f64,
    /// Split point of the two-segment power-spectrum grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmid: Option<f64>,
    pub nz: usize,
    /// Points in the dense `[zmin, zmid)` segment.
    pub nz_mid: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmin_background: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmax_background: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nz_background: Option<usize>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            remove_modules: Vec::new(),
            use_host_theory: true,
            dump_datablock_path: None,
            kmin_extrapolate: 1e-5,
            kmax: 10.0,
            kmax_extrapolate: None,
            nk: 200,
            zmin: 0.0,
            zmax: 3.01,
            zmid: None,
            nz: 150,
            nz_mid: 100,
            zmin_background: None,
            zmax_background: None,
            nz_background: None,
        }
    }
}

impl BridgeSettings {
    /// Apply a typed grid override read from the pipeline's theory section.
    ///
    /// Returns `false` for names that are not grid settings.
    pub fn apply_override(&mut self, name: &str, value: &OptionValue) -> Result<bool> {
        match name {
            "kmax" => self.kmax = value.as_float(name)?,
            "zmax" => self.zmax = value.as_float(name)?,
            "zmid" => self.zmid = Some(value.as_float(name)?),
            "zmin_background" => self.zmin_background = Some(value.as_float(name)?),
            "zmax_background" => self.zmax_background = Some(value.as_float(name)?),
            "nz" => self.nz = value.as_count(name)?,
            "nz_mid" => self.nz_mid = value.as_count(name)?,
            "nz_background" => self.nz_background = Some(value.as_count(name)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// `kmax_extrapolate`, defaulting to `kmax`.
    pub fn resolved_kmax_extrapolate(&self) -> f64 {
        self.kmax_extrapolate.unwrap_or(self.kmax)
    }

    /// Upper edge of the wavenumber grid handed to the pipeline.
    pub fn k_upper(&self) -> f64 {
        self.kmax.max(self.resolved_kmax_extrapolate())
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(BridgeError::InvalidOption {
                    option: name.to_string(),
                    value: v.to_string(),
                    expected: "positive number",
                })
            }
        };
        positive("kmin_extrapolate", self.kmin_extrapolate)?;
        positive("kmax", self.kmax)?;
        positive("kmax_extrapolate", self.resolved_kmax_extrapolate())?;
        if self.nk < 2 {
            return Err(BridgeError::InvalidOption {
                option: "nk".to_string(),
                value: self.nk.to_string(),
                expected: "count >= 2",
            });
        }
        Ok(())
    }
}
