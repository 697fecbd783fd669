//! Translation of pipeline-native configuration into a sampler run document.
//!
//! Responsibilities:
//!
//! - rename parameters into the host theory engine's conventions (`rules`)
//! - parse values and priors into parameter declarations (`params`)
//! - cast the pipeline's theory-module options (`options`)
//! - assemble (`sampler`) and serialize (`document`) the run document

pub mod document;
pub mod options;
pub mod params;
pub mod rules;
pub mod sampler;

pub use document::*;
pub use options::*;
pub use params::*;
pub use rules::*;
pub use sampler::*;
