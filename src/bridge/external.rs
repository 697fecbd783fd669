//! Interfaces of the systems the bridge sits between.
//!
//! The pipeline engine executes its modules against a data block; the theory
//! provider is the sampler framework's view of its own theory engine. Both
//! are owned elsewhere, so their failures are passed through as opaque
//! errors.

use crate::block::DataBlock;
use crate::error::EngineFailure;
use crate::ini::SectionedConfig;

/// Builds pipeline engine instances from a (possibly edited) configuration.
pub trait PipelineLoader {
    type Engine: PipelineEngine;

    fn load(&self, config: &SectionedConfig) -> Result<Self::Engine, EngineFailure>;
}

/// One pipeline engine instance. Not assumed to be reentrant: the bridge
/// owns exactly one and drives it from one thread.
pub trait PipelineEngine {
    /// One-time module setup, called before the first run.
    fn setup(&mut self) -> Result<(), EngineFailure>;

    /// Execute every module against `block`, mutating it in place.
    fn run(&mut self, block: &mut DataBlock) -> Result<(), EngineFailure>;
}

/// Matter power spectrum `P(z, k)` in physical units (`k` in 1/Mpc).
pub trait PowerSpectrum {
    fn p(&self, z: f64, k: f64) -> f64;
}

/// Which interpolator to hand out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSpectrumRequest {
    pub nonlinear: bool,
    /// Extrapolation bounds in 1/Mpc.
    pub extrap_kmin: f64,
    pub extrap_kmax: f64,
}

/// Cosmological quantities computed by the sampler's theory engine at the
/// current parameter point.
pub trait TheoryProvider {
    /// Comoving radial distance in Mpc at each redshift.
    fn comoving_radial_distance(&self, z: &[f64]) -> Result<Vec<f64>, EngineFailure>;

    fn power_spectrum(
        &self,
        request: PowerSpectrumRequest,
    ) -> Result<Box<dyn PowerSpectrum + '_>, EngineFailure>;
}

impl<F> PowerSpectrum for F
where
    F: Fn(f64, f64) -> f64,
{
    fn p(&self, z: f64, k: f64) -> f64 {
        self(z, k)
    }
}
