//! `cosmobridge` library crate.
//!
//! Runs a sectioned likelihood pipeline inside a sampler framework:
//!
//! - `translate` turns the pipeline's parameter, prior and module
//!   configuration into the sampler's run document (once, before sampling)
//! - `bridge` evaluates the pipeline at each parameter point the sampler
//!   proposes, feeding it the sampler's distances and power spectra
//!
//! The binary (`cosmobridge`) is a thin wrapper around this library.

pub mod app;
pub mod block;
pub mod bridge;
pub mod cli;
pub mod domain;
pub mod error;
pub mod grid;
pub mod ini;
pub mod translate;
