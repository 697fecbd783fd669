//! The section/key data store exchanged with the pipeline engine.
//!
//! - known sections, keys and value shapes (`names`)
//! - the store itself and its directory dump (`datablock`)

pub mod datablock;
pub mod names;

pub use datablock::*;
pub use names::*;
