//! The runtime bridge: one pipeline engine instance behind a function from
//! parameter point to log-likelihood.
//!
//! Per evaluation:
//! 1) fill in transform-computed inputs missing from the point
//! 2) build a fresh data block from the point (and, in host-theory mode,
//!    from the theory provider's distances and power spectra)
//! 3) run the pipeline against it
//! 4) optionally dump the block
//! 5) read `likelihoods/loglike_like` and the declared derived outputs

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::block::names::{
    COSMOLOGICAL_PARAMETERS, DISTANCES, LIKELIHOODS, LOGLIKE_KEY, MATTER_POWER_LIN,
    MATTER_POWER_NL, PK_K_H, PK_VALUE, PK_Z,
};
use crate::block::DataBlock;
use crate::bridge::external::{
    PipelineEngine, PipelineLoader, PowerSpectrumRequest, TheoryProvider,
};
use crate::bridge::requirements::{
    DistanceRequirement, PowerSpectrumRequirement, REQUIRED_PARAMS, Requirements,
};
use crate::bridge::settings::BridgeSettings;
use crate::domain::{DerivedOutput, DerivedTransform, ParamKey, ParamSpec, ParameterPoint};
use crate::error::{BridgeError, Result};
use crate::grid::{RedshiftGrid, log_space};
use crate::ini::SectionedConfig;
use crate::translate::document::{LIKELIHOOD_NAME, SamplerDocument};
use crate::translate::sampler::PIPELINE_SECTION;

/// Grids computed once at initialization in host-theory mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TheoryGrids {
    /// Power-spectrum redshifts.
    pub power: RedshiftGrid,
    /// Distance redshifts.
    pub background: RedshiftGrid,
    /// Wavenumbers in h/Mpc.
    pub k_h: Vec<f64>,
    pub kmin_extrapolate: f64,
    pub kmax_extrapolate: f64,
}

impl TheoryGrids {
    pub fn from_settings(settings: &BridgeSettings) -> Result<Self> {
        settings.validate()?;
        let power = RedshiftGrid::build(
            settings.zmin,
            settings.zmid,
            settings.zmax,
            settings.nz,
            settings.nz_mid,
        )?;
        let background = RedshiftGrid::linear(
            settings.zmin_background.unwrap_or(settings.zmin),
            settings.zmax_background.unwrap_or(settings.zmax),
            settings.nz_background.unwrap_or(settings.nz),
        )?;
        let k_h = log_space(settings.kmin_extrapolate, settings.k_upper(), settings.nk)?;

        Ok(Self {
            power,
            background,
            k_h,
            kmin_extrapolate: settings.kmin_extrapolate,
            kmax_extrapolate: settings.resolved_kmax_extrapolate(),
        })
    }
}

/// Quantities to request from the theory engine; empty without grids.
pub fn requirements_for(settings: &BridgeSettings, grids: Option<&TheoryGrids>) -> Requirements {
    let Some(grids) = grids else {
        return Requirements::default();
    };
    Requirements {
        params: REQUIRED_PARAMS.iter().map(|p| p.to_string()).collect(),
        pk_interpolator: Some(PowerSpectrumRequirement {
            z: grids.power.descending().to_vec(),
            vars_pairs: vec![["delta_tot".to_string(), "delta_tot".to_string()]],
            k_max: settings.kmax,
            nonlinear: [false, true],
        }),
        comoving_radial_distance: Some(DistanceRequirement {
            z: grids.background.ascending(),
        }),
    }
}

/// Force operational pipeline settings and drop superseded modules.
///
/// Names not present in the module list are skipped. Returns the remaining
/// modules in order.
pub fn prepare_pipeline_config(
    config: &mut SectionedConfig,
    remove_modules: &[String],
) -> Result<Vec<String>> {
    config.set(PIPELINE_SECTION, "quiet", "T");
    config.set(PIPELINE_SECTION, "timing", "F");

    let mut modules: Vec<String> = config
        .require(PIPELINE_SECTION, "modules")?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    for module in remove_modules {
        if let Some(pos) = modules.iter().position(|m| m == module) {
            modules.remove(pos);
            info!(module = %module, "Removing module");
        }
    }
    config.set(PIPELINE_SECTION, "modules", modules.join(" "));
    Ok(modules)
}

pub struct RuntimeBridge<E> {
    settings: BridgeSettings,
    engine: E,
    grids: Option<TheoryGrids>,
    modules: Vec<String>,
    /// Inputs computed from other inputs, filled in when absent from a point.
    transforms: BTreeMap<String, DerivedTransform>,
    /// Outputs computed from the completed point after each run.
    derived: BTreeMap<String, DerivedTransform>,
    /// Block locations reported back to the sampler after each run.
    outputs: Vec<ParamKey>,
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loglike: f64,
    /// Derived values keyed by sampler-side name (`section.key` for block
    /// outputs).
    pub derived: ParameterPoint,
}

impl<E: PipelineEngine> RuntimeBridge<E> {
    /// Edit the pipeline configuration, precompute grids, then load and set
    /// up the engine.
    pub fn new<L>(settings: BridgeSettings, mut pipeline: SectionedConfig, loader: &L) -> Result<Self>
    where
        L: PipelineLoader<Engine = E>,
    {
        let modules = prepare_pipeline_config(&mut pipeline, &settings.remove_modules)?;

        let grids = if settings.use_host_theory {
            Some(TheoryGrids::from_settings(&settings)?)
        } else {
            None
        };

        let mut engine = loader
            .load(&pipeline)
            .map_err(BridgeError::PipelineExecution)?;
        engine.setup().map_err(BridgeError::PipelineExecution)?;

        Ok(Self {
            settings,
            engine,
            grids,
            modules,
            transforms: BTreeMap::new(),
            derived: BTreeMap::new(),
            outputs: Vec::new(),
        })
    }

    /// Construct from a run document: reads the pipeline file it names and
    /// picks up the computed inputs and derived outputs it declares.
    pub fn from_document<L>(document: &SamplerDocument, loader: &L) -> Result<Self>
    where
        L: PipelineLoader<Engine = E>,
    {
        let block = document
            .bridge_block()
            .ok_or_else(|| BridgeError::MissingKey {
                section: "likelihood".to_string(),
                key: LIKELIHOOD_NAME.to_string(),
            })?;
        let pipeline = SectionedConfig::load(&block.ini_file)?;

        let mut transforms = BTreeMap::new();
        let mut derived = BTreeMap::new();
        let mut outputs = Vec::new();
        for (name, spec) in document.params.iter().chain(&block.params) {
            match spec {
                ParamSpec::Computed { value } => {
                    transforms.insert(name.clone(), value.clone());
                }
                ParamSpec::Derived {
                    derived: DerivedOutput::Transform(transform),
                } => {
                    derived.insert(name.clone(), transform.clone());
                }
                // Undotted flags are reported by the host theory engine.
                ParamSpec::Derived {
                    derived: DerivedOutput::Flag(true),
                } => outputs.extend(ParamKey::from_dotted(name)),
                _ => {}
            }
        }

        let bridge = Self::new(block.settings.clone(), pipeline, loader)?;
        Ok(bridge
            .with_transforms(transforms)
            .with_derived(derived, outputs))
    }

    pub fn with_transforms(mut self, transforms: BTreeMap<String, DerivedTransform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_derived(
        mut self,
        derived: BTreeMap<String, DerivedTransform>,
        outputs: Vec<ParamKey>,
    ) -> Self {
        self.derived = derived;
        self.outputs = outputs;
        self
    }

    /// Block locations read back as derived parameters.
    pub fn derived_outputs(&self) -> &[ParamKey] {
        &self.outputs
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Modules the engine runs, after removals.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn grids(&self) -> Option<&TheoryGrids> {
        self.grids.as_ref()
    }

    pub fn declare_requirements(&self) -> Requirements {
        requirements_for(&self.settings, self.grids.as_ref())
    }

    /// Log-likelihood at one parameter point.
    pub fn evaluate(
        &mut self,
        params: &ParameterPoint,
        theory: Option<&dyn TheoryProvider>,
    ) -> Result<f64> {
        Ok(self.evaluate_with_derived(params, theory)?.loglike)
    }

    /// Log-likelihood plus the derived parameters declared for the run.
    ///
    /// Block outputs missing after the run are an error. Derived transforms
    /// whose inputs the point does not carry are skipped.
    pub fn evaluate_with_derived(
        &mut self,
        params: &ParameterPoint,
        theory: Option<&dyn TheoryProvider>,
    ) -> Result<Evaluation> {
        let params = self.complete_parameters(params);
        let mut block = self.populate_block(&params, theory)?;

        self.engine
            .run(&mut block)
            .map_err(BridgeError::PipelineExecution)?;

        if let Some(dir) = &self.settings.dump_datablock_path {
            block.save_to_directory(dir)?;
        }

        let loglike = block
            .get_scalar(LIKELIHOODS, LOGLIKE_KEY)
            .ok_or_else(|| BridgeError::MissingResult {
                section: LIKELIHOODS.to_string(),
                key: LOGLIKE_KEY.to_string(),
            })?;

        let mut derived = ParameterPoint::new();
        for key in &self.outputs {
            let value = block
                .get_scalar(&key.section, &key.name)
                .ok_or_else(|| BridgeError::MissingResult {
                    section: key.section.clone(),
                    key: key.name.clone(),
                })?;
            derived.insert(key.dotted(), value);
        }
        for (name, transform) in &self.derived {
            match transform.evaluate(&params) {
                Ok(value) => {
                    derived.insert(name.clone(), value);
                }
                Err(_) => {
                    debug!(
                        parameter = %name,
                        missing = ?transform.missing_inputs(&params),
                        "Derived parameter skipped, inputs missing"
                    );
                }
            }
        }

        debug!(n_params = params.len(), n_derived = derived.len(), loglike, "Evaluated pipeline");
        Ok(Evaluation { loglike, derived })
    }

    /// Add transform outputs the point does not already carry. Transforms
    /// whose inputs are missing are left out.
    pub fn complete_parameters(&self, params: &ParameterPoint) -> ParameterPoint {
        let mut out = params.clone();
        let mut pending: Vec<(&String, &DerivedTransform)> = self
            .transforms
            .iter()
            .filter(|(name, _)| !out.contains_key(*name))
            .collect();

        // Transforms may feed each other (sigma8 needs H0); repeat until stable.
        loop {
            let before = pending.len();
            pending.retain(|(name, transform)| match transform.evaluate(&out) {
                Ok(value) => {
                    out.insert((*name).clone(), value);
                    false
                }
                Err(_) => true,
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        for (name, transform) in pending {
            debug!(
                parameter = %name,
                missing = ?transform.missing_inputs(&out),
                "Computed input skipped, inputs missing"
            );
        }
        out
    }

    /// Build the data block for one evaluation.
    pub fn populate_block(
        &self,
        params: &ParameterPoint,
        theory: Option<&dyn TheoryProvider>,
    ) -> Result<DataBlock> {
        let mut block = DataBlock::new();
        for (name, value) in params {
            if let Some(key) = ParamKey::from_dotted(name) {
                block.put_scalar(&key.section, &key.name, *value)?;
            }
        }

        if let Some(grids) = &self.grids {
            let theory = theory.ok_or(BridgeError::MissingTheory)?;
            write_theory_quantities(&mut block, grids, params, theory)?;
        }
        Ok(block)
    }
}

fn require(params: &ParameterPoint, name: &str) -> Result<f64> {
    params
        .get(name)
        .copied()
        .ok_or_else(|| BridgeError::MissingParameter(name.to_string()))
}

/// Cosmology scalars, distances and power spectra from the theory provider.
///
/// Power spectra are stored in per-h units: `P_stored(z, k_h) = h³ P(z, k_h h)`.
fn write_theory_quantities(
    block: &mut DataBlock,
    grids: &TheoryGrids,
    params: &ParameterPoint,
    theory: &dyn TheoryProvider,
) -> Result<()> {
    let h = require(params, "H0")? / 100.0;
    let omegam = require(params, "omegam")?;

    block.put_scalar(COSMOLOGICAL_PARAMETERS, "h", h)?;
    block.put_scalar(COSMOLOGICAL_PARAMETERS, "h0", h)?;
    block.put_scalar(COSMOLOGICAL_PARAMETERS, "omega_m", omegam)?;

    let z_background = grids.background.ascending();
    let d_m = theory
        .comoving_radial_distance(&z_background)
        .map_err(BridgeError::TheoryProvider)?;
    if d_m.len() != z_background.len() {
        return Err(BridgeError::TheoryProvider(
            format!(
                "{} distances returned for {} redshifts",
                d_m.len(),
                z_background.len()
            )
            .into(),
        ));
    }
    let a: Vec<f64> = z_background.iter().map(|z| 1.0 / (1.0 + z)).collect();
    block.put_vector(DISTANCES, "z", z_background)?;
    block.put_vector(DISTANCES, "a", a)?;
    block.put_vector(DISTANCES, "d_m", d_m)?;

    let z = grids.power.ascending();
    let h3 = h * h * h;
    for (section, nonlinear) in [(MATTER_POWER_LIN, false), (MATTER_POWER_NL, true)] {
        let pk = theory
            .power_spectrum(PowerSpectrumRequest {
                nonlinear,
                extrap_kmin: grids.kmin_extrapolate * h,
                extrap_kmax: grids.kmax_extrapolate * h,
            })
            .map_err(BridgeError::TheoryProvider)?;
        let values = DMatrix::from_fn(z.len(), grids.k_h.len(), |i, j| {
            h3 * pk.p(z[i], grids.k_h[j] * h)
        });
        block.put_grid(
            section,
            (PK_Z, z.clone()),
            (PK_K_H, grids.k_h.clone()),
            PK_VALUE,
            values,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::bridge::external::PowerSpectrum;
    use crate::domain::{SamplerKind, TheorySource};
    use crate::error::EngineFailure;
    use crate::translate::sampler::{TranslationOptions, build_sampler_config};

    /// Writes a fixed log-likelihood (or nothing) plus fixed extra scalars,
    /// and keeps the last block.
    struct StubEngine {
        loglike: Option<f64>,
        writes: Vec<(&'static str, &'static str, f64)>,
        fail: bool,
        setup_calls: usize,
        last_block: Option<DataBlock>,
    }

    impl PipelineEngine for StubEngine {
        fn setup(&mut self) -> std::result::Result<(), EngineFailure> {
            self.setup_calls += 1;
            Ok(())
        }

        fn run(&mut self, block: &mut DataBlock) -> std::result::Result<(), EngineFailure> {
            if self.fail {
                return Err("module 2pt_like failed".into());
            }
            if let Some(v) = self.loglike {
                block.put_scalar(LIKELIHOODS, LOGLIKE_KEY, v).expect("scalar slot");
            }
            for &(section, key, v) in &self.writes {
                block.put_scalar(section, key, v).expect("scalar slot");
            }
            self.last_block = Some(block.clone());
            Ok(())
        }
    }

    struct StubLoader {
        loglike: Option<f64>,
        writes: Vec<(&'static str, &'static str, f64)>,
        fail: bool,
    }

    impl PipelineLoader for StubLoader {
        type Engine = StubEngine;

        fn load(&self, _config: &SectionedConfig) -> std::result::Result<StubEngine, EngineFailure> {
            Ok(StubEngine {
                loglike: self.loglike,
                writes: self.writes.clone(),
                fail: self.fail,
                setup_calls: 0,
                last_block: None,
            })
        }
    }

    fn returning(loglike: Option<f64>) -> StubLoader {
        StubLoader {
            loglike,
            writes: Vec::new(),
            fail: false,
        }
    }

    fn writing(loglike: f64, writes: &[(&'static str, &'static str, f64)]) -> StubLoader {
        StubLoader {
            loglike: Some(loglike),
            writes: writes.to_vec(),
            fail: false,
        }
    }

    /// `P(z, k) = A k^-1.5 / (1 + z)` with `A = 2` for the nonlinear spectrum.
    struct SyntheticTheory;

    fn synthetic_pk(nonlinear: bool, z: f64, k: f64) -> f64 {
        let amplitude = if nonlinear { 2.0 } else { 1.0 };
        amplitude * k.powf(-1.5) / (1.0 + z)
    }

    impl TheoryProvider for SyntheticTheory {
        fn comoving_radial_distance(&self, z: &[f64]) -> std::result::Result<Vec<f64>, EngineFailure> {
            Ok(z.iter().map(|z| 3000.0 * z).collect())
        }

        fn power_spectrum(
            &self,
            request: PowerSpectrumRequest,
        ) -> std::result::Result<Box<dyn PowerSpectrum + '_>, EngineFailure> {
            Ok(Box::new(move |z: f64, k: f64| synthetic_pk(request.nonlinear, z, k)))
        }
    }

    fn pipeline(modules: &str) -> SectionedConfig {
        SectionedConfig::parse(
            &format!("[pipeline]\nmodules = {modules}\nquiet = F\n"),
            Path::new("pipeline.ini"),
        )
        .unwrap()
    }

    fn host_settings() -> BridgeSettings {
        BridgeSettings {
            nz: 12,
            nz_mid: 8,
            zmid: Some(0.5),
            zmax: 2.0,
            nk: 16,
            nz_background: Some(6),
            remove_modules: vec!["camb".to_string()],
            ..BridgeSettings::default()
        }
    }

    fn no_theory_settings() -> BridgeSettings {
        BridgeSettings {
            use_host_theory: false,
            ..BridgeSettings::default()
        }
    }

    fn point(pairs: &[(&str, f64)]) -> ParameterPoint {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn evaluate_returns_pipeline_scalar() {
        let mut bridge =
            RuntimeBridge::new(no_theory_settings(), pipeline("a b"), &returning(Some(-42.5))).unwrap();
        assert_eq!(bridge.engine().setup_calls, 1);

        let loglike = bridge
            .evaluate(&point(&[("shear_calibration_parameters.m1", 0.01)]), None)
            .unwrap();
        assert_eq!(loglike, -42.5);

        let block = bridge.engine().last_block.as_ref().unwrap();
        assert_eq!(block.get_scalar("shear_calibration_parameters", "m1"), Some(0.01));
    }

    #[test]
    fn missing_result_is_an_error() {
        let mut bridge =
            RuntimeBridge::new(no_theory_settings(), pipeline("a"), &returning(None)).unwrap();
        let err = bridge.evaluate(&ParameterPoint::new(), None).unwrap_err();
        assert!(matches!(err, BridgeError::MissingResult { .. }));
    }

    #[test]
    fn engine_failure_propagates() {
        let loader = StubLoader {
            loglike: Some(0.0),
            writes: Vec::new(),
            fail: true,
        };
        let mut bridge = RuntimeBridge::new(no_theory_settings(), pipeline("a"), &loader).unwrap();
        let err = bridge.evaluate(&ParameterPoint::new(), None).unwrap_err();
        match err {
            BridgeError::PipelineExecution(source) => {
                assert_eq!(source.to_string(), "module 2pt_like failed");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn blocks_do_not_leak_between_evaluations() {
        let mut bridge =
            RuntimeBridge::new(no_theory_settings(), pipeline("a"), &returning(Some(1.0))).unwrap();
        bridge.evaluate(&point(&[("nuisance.x", 1.0)]), None).unwrap();
        bridge.evaluate(&point(&[("nuisance.y", 2.0)]), None).unwrap();

        let block = bridge.engine().last_block.as_ref().unwrap();
        assert_eq!(block.get_scalar("nuisance", "x"), None);
        assert_eq!(block.get_scalar("nuisance", "y"), Some(2.0));
    }

    #[test]
    fn removing_absent_module_is_a_no_op() {
        let mut config = pipeline("consistency camb 2pt_like");
        let modules = prepare_pipeline_config(&mut config, &["cosmopower".to_string()]).unwrap();
        assert_eq!(modules, ["consistency", "camb", "2pt_like"]);
        assert_eq!(config.get("pipeline", "modules"), Some("consistency camb 2pt_like"));
    }

    #[test]
    fn removal_and_operational_overrides() {
        let mut config = pipeline("consistency camb distances 2pt_like");
        let remove = ["camb".to_string(), "distances".to_string(), "sigma8toAs".to_string()];
        let modules = prepare_pipeline_config(&mut config, &remove).unwrap();
        assert_eq!(modules, ["consistency", "2pt_like"]);
        assert_eq!(config.get("pipeline", "quiet"), Some("T"));
        assert_eq!(config.get("pipeline", "timing"), Some("F"));
    }

    #[test]
    fn missing_modules_key_is_reported() {
        let mut config = SectionedConfig::parse("[pipeline]\nquiet = F\n", Path::new("p.ini")).unwrap();
        assert!(matches!(
            prepare_pipeline_config(&mut config, &[]),
            Err(BridgeError::MissingKey { .. })
        ));
    }

    #[test]
    fn requirements_follow_theory_mode() {
        let bridge =
            RuntimeBridge::new(no_theory_settings(), pipeline("a"), &returning(Some(0.0))).unwrap();
        assert!(bridge.declare_requirements().is_empty());

        let bridge = RuntimeBridge::new(host_settings(), pipeline("camb a"), &returning(Some(0.0))).unwrap();
        assert_eq!(bridge.modules(), ["a"]);
        let req = bridge.declare_requirements();
        assert_eq!(req.params, REQUIRED_PARAMS);
        let pk = req.pk_interpolator.unwrap();
        assert_eq!(pk.z.len(), 12);
        assert!(pk.z.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(pk.k_max, 10.0);
        assert_eq!(req.comoving_radial_distance.unwrap().z.len(), 6);
    }

    #[test]
    fn power_spectra_are_stored_in_per_h_units() {
        let bridge = RuntimeBridge::new(host_settings(), pipeline("a"), &returning(Some(0.0))).unwrap();
        let h = 0.67;
        let params = point(&[("H0", 100.0 * h), ("omegam", 0.31)]);
        let block = bridge.populate_block(&params, Some(&SyntheticTheory)).unwrap();

        for (section, nonlinear) in [(MATTER_POWER_LIN, false), (MATTER_POWER_NL, true)] {
            let grid = block.get_grid(section, PK_VALUE).unwrap();
            assert_eq!(grid.x.len(), 12);
            assert_eq!(grid.y.len(), 16);
            assert!(grid.x.windows(2).all(|w| w[1] > w[0]), "z must be ascending");
            for (i, &z) in grid.x.iter().enumerate() {
                for (j, &k_h) in grid.y.iter().enumerate() {
                    let expected = h.powi(3) * synthetic_pk(nonlinear, z, k_h * h);
                    let got = grid.at(i, j);
                    assert!(
                        ((got - expected) / expected).abs() < 1e-12,
                        "P({z}, {k_h}) = {got}, expected {expected}"
                    );
                }
            }
        }

        let k_h = block.get_vector(MATTER_POWER_LIN, PK_K_H).unwrap();
        assert!((k_h[0] - 1e-5).abs() < 1e-15);
        assert!((k_h[15] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn cosmology_and_distances_are_written() {
        let bridge = RuntimeBridge::new(host_settings(), pipeline("a"), &returning(Some(0.0))).unwrap();
        let params = point(&[("H0", 70.0), ("omegam", 0.3), ("ombh2", 0.0224)]);
        let block = bridge.populate_block(&params, Some(&SyntheticTheory)).unwrap();

        assert_eq!(block.get_scalar(COSMOLOGICAL_PARAMETERS, "h"), Some(0.7));
        assert_eq!(block.get_scalar(COSMOLOGICAL_PARAMETERS, "h0"), Some(0.7));
        assert_eq!(block.get_scalar(COSMOLOGICAL_PARAMETERS, "omega_m"), Some(0.3));
        // Names without a section are not pipeline parameters.
        assert!(!block.has_section("ombh2"));

        let z = block.get_vector(DISTANCES, "z").unwrap();
        let a = block.get_vector(DISTANCES, "a").unwrap();
        let d_m = block.get_vector(DISTANCES, "d_m").unwrap();
        assert_eq!(z.len(), 6);
        assert_eq!(z[0], 0.0);
        assert_eq!(z[5], 2.0);
        for i in 0..z.len() {
            assert!((a[i] - 1.0 / (1.0 + z[i])).abs() < 1e-15);
            assert!((d_m[i] - 3000.0 * z[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn host_theory_needs_provider_and_hubble() {
        let mut bridge =
            RuntimeBridge::new(host_settings(), pipeline("a"), &returning(Some(0.0))).unwrap();
        let err = bridge
            .evaluate(&point(&[("H0", 70.0), ("omegam", 0.3)]), None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingTheory));

        let err = bridge
            .evaluate(&point(&[("omegam", 0.3)]), Some(&SyntheticTheory))
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingParameter(name) if name == "H0"));
    }

    #[test]
    fn transforms_fill_missing_inputs() {
        let transforms = BTreeMap::from([("H0".to_string(), DerivedTransform::hubble_from_h0())]);
        let mut bridge = RuntimeBridge::new(host_settings(), pipeline("a"), &returning(Some(-1.0)))
            .unwrap()
            .with_transforms(transforms);

        let loglike = bridge
            .evaluate(&point(&[("h0", 0.7), ("omegam", 0.3)]), Some(&SyntheticTheory))
            .unwrap();
        assert_eq!(loglike, -1.0);
        let block = bridge.engine().last_block.as_ref().unwrap();
        assert!((block.get_scalar(COSMOLOGICAL_PARAMETERS, "h").unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn supplied_values_win_over_transforms() {
        let transforms = BTreeMap::from([("H0".to_string(), DerivedTransform::hubble_from_h0())]);
        let bridge = RuntimeBridge::new(no_theory_settings(), pipeline("a"), &returning(Some(0.0)))
            .unwrap()
            .with_transforms(transforms);
        let completed = bridge.complete_parameters(&point(&[("h0", 0.7), ("H0", 68.0)]));
        assert_eq!(completed["H0"], 68.0);
    }

    #[test]
    fn block_outputs_are_reported_as_derived() {
        let loader = writing(-5.0, &[("data_vector", "2pt_chi2", 10.0)]);
        let mut bridge = RuntimeBridge::new(no_theory_settings(), pipeline("a"), &loader)
            .unwrap()
            .with_derived(BTreeMap::new(), vec![ParamKey::new("data_vector", "2pt_chi2")]);

        let eval = bridge.evaluate_with_derived(&ParameterPoint::new(), None).unwrap();
        assert_eq!(eval.loglike, -5.0);
        assert_eq!(eval.derived["data_vector.2pt_chi2"], 10.0);
    }

    #[test]
    fn missing_block_output_is_an_error() {
        let mut bridge = RuntimeBridge::new(no_theory_settings(), pipeline("a"), &returning(Some(0.0)))
            .unwrap()
            .with_derived(BTreeMap::new(), vec![ParamKey::new("data_vector", "2pt_chi2")]);
        let err = bridge.evaluate(&ParameterPoint::new(), None).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MissingResult { section, key } if section == "data_vector" && key == "2pt_chi2"
        ));
    }

    #[test]
    fn derived_transforms_use_the_completed_point() {
        let s8 = DerivedTransform::DerivedS8 {
            reference_omegam: 0.3,
        };
        let mut bridge = RuntimeBridge::new(no_theory_settings(), pipeline("a"), &returning(Some(0.0)))
            .unwrap()
            .with_derived(BTreeMap::from([("s8".to_string(), s8)]), Vec::new());

        let eval = bridge
            .evaluate_with_derived(&point(&[("sigma8", 0.8), ("omegam", 0.3 * 1.21)]), None)
            .unwrap();
        assert!((eval.derived["s8"] - 0.88).abs() < 1e-12);

        // Without omegam the output is skipped, not an error.
        let eval = bridge
            .evaluate_with_derived(&point(&[("sigma8", 0.8)]), None)
            .unwrap();
        assert!(eval.derived.is_empty());
    }

    #[test]
    fn dump_directory_receives_the_block() {
        let dir = tempfile::tempdir().unwrap();
        let settings = BridgeSettings {
            dump_datablock_path: Some(dir.path().join("block")),
            ..no_theory_settings()
        };
        let mut bridge = RuntimeBridge::new(settings, pipeline("a"), &returning(Some(-3.0))).unwrap();
        bridge.evaluate(&point(&[("nuisance.x", 1.0)]), None).unwrap();

        let values = std::fs::read_to_string(dir.path().join("block/likelihoods/values.txt")).unwrap();
        assert!(values.contains("loglike_like = -3"));
    }

    #[test]
    fn bridge_builds_from_translated_document() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline_path = dir.path().join("pipeline.ini");
        std::fs::write(
            &pipeline_path,
            "[pipeline]\nmodules = consistency camb distances 2pt_like\n\
             extra_output = data_vector/2pt_chi2 cosmological_parameters/sigma_8\n\
             [camb]\nnz = 20\nzmid = 1.0\nnz_mid = 10\n",
        )
        .unwrap();
        let values = SectionedConfig::parse(
            "[cosmological_parameters]\n\
             h0 = 0.55 0.7 0.91\n\
             s_8_input = 0.1 0.8 1.3\n\
             ombh2 = 0.0245\n\
             omch2 = 0.1225\n",
            Path::new("values.ini"),
        )
        .unwrap();
        let options = TranslationOptions {
            pipeline_file: pipeline_path.clone(),
            sampler_output: "chains/run".to_string(),
            sampler: SamplerKind::Evaluate,
            covmat: None,
            theory: TheorySource::Host,
            halofit_version: "mead2020_feedback".to_string(),
            neutrino_hierarchy: "normal".to_string(),
        };
        let pipeline_cfg = SectionedConfig::load(&pipeline_path).unwrap();
        let doc = build_sampler_config(&pipeline_cfg, &values, None, &options).unwrap();
        let doc_path = dir.path().join("run.yaml");
        doc.write(&doc_path).unwrap();

        let doc = SamplerDocument::load(&doc_path).unwrap();
        let loader = writing(-7.0, &[("data_vector", "2pt_chi2", 14.0)]);
        let mut bridge = RuntimeBridge::from_document(&doc, &loader).unwrap();
        assert_eq!(bridge.modules(), ["consistency", "2pt_like"]);
        assert_eq!(bridge.grids().unwrap().power.len(), 20);
        // Cosmology outputs come from the host theory engine.
        assert_eq!(bridge.derived_outputs(), [ParamKey::new("data_vector", "2pt_chi2")]);

        let params = point(&[
            ("h0", 0.7),
            ("s_8_input", 0.8),
            ("ombh2", 0.0245),
            ("omch2", 0.1225),
            ("omegam", 0.3),
        ]);
        let eval = bridge
            .evaluate_with_derived(&params, Some(&SyntheticTheory))
            .unwrap();
        assert_eq!(eval.loglike, -7.0);
        assert_eq!(eval.derived["data_vector.2pt_chi2"], 14.0);
        // omegam from (ombh2 + omch2) / h^2 equals the reference 0.3, so S8
        // round-trips through sigma8.
        assert!((eval.derived["s8"] - 0.8).abs() < 1e-12, "s8 = {}", eval.derived["s8"]);
    }
}
