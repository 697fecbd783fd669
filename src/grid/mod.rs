//! Sampling grids handed to the theory engine and the pipeline.
//!
//! - evenly and log-spaced point sequences (`spacing`)
//! - redshift grids for power spectra and distances (`redshift`)

pub mod redshift;
pub mod spacing;

pub use redshift::*;
pub use spacing::*;
