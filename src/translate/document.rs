//! The run document consumed by the sampler framework.
//!
//! The document is assembled in memory and serialized in one go, so a
//! failed translation never leaves a partial file behind. It is written as
//! YAML, or as pretty JSON when the output path ends in `.json`.

use std::collections::BTreeMap;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bridge::BridgeSettings;
use crate::domain::ParamSpec;
use crate::error::{BridgeError, Result};

/// Name under which the sampler framework finds the runtime bridge.
pub const LIKELIHOOD_NAME: &str = "cosmobridge.PipelineLikelihood";

/// Name of the host theory engine.
pub const THEORY_ENGINE: &str = "camb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerDocument {
    pub debug: bool,
    pub stop_at_error: bool,
    pub timing: bool,
    /// Output prefix of the sampler run.
    pub output: String,
    pub sampler: SamplerSpec,
    pub likelihood: BTreeMap<String, LikelihoodBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theory: Option<BTreeMap<String, TheoryEngineSpec>>,
    /// Cosmology parameters handled by the host theory engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamSpec>,
}

/// Sampler selection. Written as a one-entry map from sampler name to its
/// options (`evaluate: null`, `mcmc: {covmat: ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SamplerBlock", try_from = "SamplerBlock")]
pub enum SamplerSpec {
    Evaluate,
    Mcmc { covmat: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McmcOptions {
    pub covmat: PathBuf,
}

type SamplerBlock = BTreeMap<String, Option<McmcOptions>>;

impl From<SamplerSpec> for SamplerBlock {
    fn from(spec: SamplerSpec) -> Self {
        let mut block = SamplerBlock::new();
        match spec {
            SamplerSpec::Evaluate => block.insert("evaluate".to_string(), None),
            SamplerSpec::Mcmc { covmat } => block.insert(
                "mcmc".to_string(),
                covmat.map(|covmat| McmcOptions { covmat }),
            ),
        };
        block
    }
}

impl TryFrom<SamplerBlock> for SamplerSpec {
    type Error = String;

    fn try_from(block: SamplerBlock) -> std::result::Result<Self, Self::Error> {
        let mut entries = block.into_iter();
        let (Some((name, options)), None) = (entries.next(), entries.next()) else {
            return Err("sampler block must name exactly one sampler".to_string());
        };
        match name.as_str() {
            "evaluate" => Ok(SamplerSpec::Evaluate),
            "mcmc" => Ok(SamplerSpec::Mcmc {
                covmat: options.map(|o| o.covmat),
            }),
            other => Err(format!("unsupported sampler '{other}'")),
        }
    }
}

/// Construction arguments of the bridge plus the pipeline-side parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodBlock {
    pub ini_file: PathBuf,
    #[serde(flatten)]
    pub settings: BridgeSettings,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoryEngineSpec {
    pub extra_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

impl SamplerDocument {
    /// The bridge's likelihood block.
    pub fn bridge_block(&self) -> Option<&LikelihoodBlock> {
        self.likelihood.get(LIKELIHOOD_NAME)
    }

    /// Serialize the whole document to text.
    pub fn render(&self, path: &Path) -> Result<String> {
        match Format::for_path(path) {
            Format::Json => Ok(serde_json::to_string_pretty(self)? + "\n"),
            Format::Yaml => {
                let body = serde_yaml::to_string(self)?;
                Ok(format!(
                    "# Generated by cosmobridge {} on {}\n{body}",
                    env!("CARGO_PKG_VERSION"),
                    Local::now().to_rfc3339()
                ))
            }
        }
    }

    /// Write the document, creating the parent directory if needed.
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.render(path)?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                info!(dir = %dir.display(), "Output directory does not exist, creating");
                create_dir_all(dir).map_err(|e| BridgeError::io(dir, e))?;
            }
        }

        let mut file = File::create(path).map_err(|e| BridgeError::io(path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| BridgeError::io(path, e))?;
        info!(path = %path.display(), "Wrote sampler document");
        Ok(())
    }

    /// Read a document written by [`write`](Self::write).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BridgeError::NotFound(path.to_path_buf()),
            _ => BridgeError::io(path, e),
        })?;
        // JSON documents are valid YAML.
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DerivedOutput, DerivedTransform, PriorSpec, SampledSpec};

    fn document() -> SamplerDocument {
        let mut params = BTreeMap::new();
        params.insert(
            "shear_calibration_parameters.m1".to_string(),
            ParamSpec::Sampled(SampledSpec {
                reference: 0.0,
                prior: PriorSpec::Gaussian { loc: 0.0, scale: 0.02 },
                drop: None,
            }),
        );
        let mut likelihood = BTreeMap::new();
        likelihood.insert(
            LIKELIHOOD_NAME.to_string(),
            LikelihoodBlock {
                ini_file: PathBuf::from("pipeline.ini"),
                settings: BridgeSettings {
                    remove_modules: vec!["camb".to_string()],
                    zmid: Some(0.5),
                    ..BridgeSettings::default()
                },
                params,
            },
        );

        let mut cosmology = BTreeMap::new();
        cosmology.insert(
            "H0".to_string(),
            ParamSpec::Computed {
                value: DerivedTransform::hubble_from_h0(),
            },
        );
        cosmology.insert("omegam".to_string(), ParamSpec::requested());
        cosmology.insert(
            "s8".to_string(),
            ParamSpec::Derived {
                derived: DerivedOutput::Transform(DerivedTransform::DerivedS8 {
                    reference_omegam: 0.3,
                }),
            },
        );

        SamplerDocument {
            debug: false,
            stop_at_error: true,
            timing: true,
            output: "chains/run".to_string(),
            sampler: SamplerSpec::Mcmc {
                covmat: Some(PathBuf::from("run.covmat")),
            },
            likelihood,
            theory: None,
            params: cosmology,
        }
    }

    #[test]
    fn yaml_document_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run.yaml");
        let doc = document();
        doc.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Generated by cosmobridge"));
        assert!(text.contains("covmat: run.covmat"));

        let back = SamplerDocument::load(&path).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.bridge_block().unwrap().settings.zmid, Some(0.5));
    }

    #[test]
    fn json_extension_selects_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let doc = document();
        doc.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["stop_at_error"], true);
        assert_eq!(value["params"]["H0"]["value"]["transform"], "rescale");
        assert_eq!(SamplerDocument::load(&path).unwrap(), doc);
    }

    #[test]
    fn evaluate_sampler_is_a_null_block() {
        let yaml = serde_yaml::to_string(&SamplerSpec::Evaluate).unwrap();
        assert_eq!(yaml.trim(), "evaluate: null");
        let back: SamplerSpec = serde_yaml::from_str("mcmc: null").unwrap();
        assert_eq!(back, SamplerSpec::Mcmc { covmat: None });
        assert!(serde_yaml::from_str::<SamplerSpec>("polychord: null").is_err());
    }
}
