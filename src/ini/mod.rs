//! Sectioned `key = value` configuration files.
//!
//! Pipeline definitions, parameter values and priors all use the same INI
//! dialect; `sectioned` reads and edits it.

pub mod sectioned;

pub use sectioned::*;
