//! Runtime bridge between the sampler framework and the pipeline engine.
//!
//! - interfaces of both external systems (`external`)
//! - construction arguments (`settings`)
//! - per-evaluation quantities requested from the theory engine (`requirements`)
//! - initialization and evaluation (`runtime`)

pub mod external;
pub mod requirements;
pub mod runtime;
pub mod settings;

pub use external::*;
pub use requirements::*;
pub use runtime::*;
pub use settings::*;
