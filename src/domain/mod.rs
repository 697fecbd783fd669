//! Domain types shared by the translator and the runtime bridge.
//!
//! This module defines:
//!
//! - declared parameters and their priors (`ParameterEntry`, `PriorSpec`)
//! - the sampler-side shape of a parameter declaration (`ParamSpec`)
//! - the closed set of derived-parameter transforms (`DerivedTransform`)

pub mod types;

pub use types::*;
