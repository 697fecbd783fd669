//! Typed options read from the pipeline's theory-module section.
//!
//! The pipeline's own theory module carries grid sizes and bounds that the
//! bridge should reuse, plus the nonlinear model variant and neutrino scheme
//! that the host theory engine needs. Raw strings are cast once, here,
//! against a fixed option table.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::ini::SectionedConfig;

/// Section of the pipeline file configuring its theory module.
pub const THEORY_SECTION: &str = "camb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Int,
    Float,
    Str,
}

impl OptionKind {
    fn label(self) -> &'static str {
        match self {
            OptionKind::Int => "integer",
            OptionKind::Float => "float",
            OptionKind::Str => "string",
        }
    }
}

/// Where a theory option ends up in the run document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTarget {
    /// Grid setting of the bridge (likelihood block).
    Bridge,
    /// Extra argument of the host theory engine.
    Theory,
}

/// Recognized theory options: name, type, destination.
pub const THEORY_OPTIONS: &[(&str, OptionKind, OptionTarget)] = &[
    ("kmax", OptionKind::Float, OptionTarget::Bridge),
    ("zmid", OptionKind::Float, OptionTarget::Bridge),
    ("nz_mid", OptionKind::Int, OptionTarget::Bridge),
    ("zmax", OptionKind::Float, OptionTarget::Bridge),
    ("nz", OptionKind::Int, OptionTarget::Bridge),
    ("zmax_background", OptionKind::Float, OptionTarget::Bridge),
    ("zmin_background", OptionKind::Float, OptionTarget::Bridge),
    ("nz_background", OptionKind::Int, OptionTarget::Bridge),
    ("halofit_version", OptionKind::Str, OptionTarget::Theory),
    ("neutrino_hierarchy", OptionKind::Str, OptionTarget::Theory),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    pub fn as_float(&self, name: &str) -> Result<f64> {
        match self {
            OptionValue::Float(v) => Ok(*v),
            OptionValue::Int(v) => Ok(*v as f64),
            OptionValue::Str(s) => Err(invalid(name, s, OptionKind::Float)),
        }
    }

    /// Non-negative integer.
    pub fn as_count(&self, name: &str) -> Result<usize> {
        match self {
            OptionValue::Int(v) => {
                usize::try_from(*v).map_err(|_| invalid(name, &v.to_string(), OptionKind::Int))
            }
            OptionValue::Float(v) => Err(invalid(name, &v.to_string(), OptionKind::Int)),
            OptionValue::Str(s) => Err(invalid(name, s, OptionKind::Int)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Cast a raw option string to its declared type.
pub fn cast_option(name: &str, raw: &str, kind: OptionKind) -> Result<OptionValue> {
    let raw = raw.trim();
    match kind {
        OptionKind::Int => raw
            .parse::<i64>()
            .map(OptionValue::Int)
            .map_err(|_| invalid(name, raw, kind)),
        OptionKind::Float => raw
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|_| invalid(name, raw, kind)),
        OptionKind::Str => Ok(OptionValue::Str(raw.to_string())),
    }
}

/// Recognized options present in the theory section, cast to their types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TheoryOptions {
    pub bridge: Vec<(String, OptionValue)>,
    pub theory: Vec<(String, OptionValue)>,
}

impl TheoryOptions {
    /// Read the theory section. A pipeline without one yields no options.
    pub fn from_pipeline(pipeline: &SectionedConfig) -> Result<Self> {
        let mut out = TheoryOptions::default();
        if !pipeline.has_section(THEORY_SECTION) {
            return Ok(out);
        }
        for &(name, kind, target) in THEORY_OPTIONS {
            let Some(raw) = pipeline.get(THEORY_SECTION, name) else {
                continue;
            };
            let value = cast_option(name, raw, kind)?;
            match target {
                OptionTarget::Bridge => out.bridge.push((name.to_string(), value)),
                OptionTarget::Theory => out.theory.push((name.to_string(), value)),
            }
        }
        Ok(out)
    }

    /// String-valued theory option, if present.
    pub fn theory_str(&self, name: &str) -> Option<&str> {
        self.theory
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_str())
    }
}

fn invalid(name: &str, value: &str, kind: OptionKind) -> BridgeError {
    BridgeError::InvalidOption {
        option: name.to_string(),
        value: value.to_string(),
        expected: kind.label(),
    }
}
