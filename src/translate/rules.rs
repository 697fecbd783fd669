//! Parameter renaming between pipeline and theory-engine conventions.
//!
//! When the sampler's theory engine computes the cosmology, a handful of
//! pipeline parameters are spelled differently on its side, and some halo-model
//! parameters move into the cosmology section because the theory engine's
//! nonlinear model consumes them directly. Which halo-model parameter moves
//! depends on the model variant.

pub use crate::block::names::{COSMOLOGICAL_PARAMETERS, HALO_MODEL_PARAMETERS};
use crate::domain::ParamKey;

pub const VARIANT_MEAD2015: &str = "mead2015";
pub const VARIANT_MEAD2016: &str = "mead2016";
pub const VARIANT_MEAD2020_FEEDBACK: &str = "mead2020_feedback";

/// Map a pipeline `(section, name)` to its theory-engine address.
///
/// Total: pairs without a rule map to themselves. Option names are already
/// lowercased by the INI reader, so the halo-model names are matched in
/// lowercase.
pub fn translate_to_host_theory(key: &ParamKey, model_variant: &str) -> ParamKey {
    match (key.section.as_str(), key.name.as_str()) {
        (COSMOLOGICAL_PARAMETERS, "n_s") => ParamKey::new(COSMOLOGICAL_PARAMETERS, "ns"),
        (COSMOLOGICAL_PARAMETERS, "omega_k") => ParamKey::new(COSMOLOGICAL_PARAMETERS, "omegak"),
        (HALO_MODEL_PARAMETERS, "logt_agn") if model_variant == VARIANT_MEAD2020_FEEDBACK => {
            ParamKey::new(COSMOLOGICAL_PARAMETERS, "HMCode_logT_AGN")
        }
        (HALO_MODEL_PARAMETERS, "a")
            if matches!(model_variant, VARIANT_MEAD2015 | VARIANT_MEAD2016) =>
        {
            ParamKey::new(COSMOLOGICAL_PARAMETERS, "HMCode_A_baryon")
        }
        _ => key.clone(),
    }
}

/// Apply the renaming only when the host theory engine is in use.
pub fn translate(key: &ParamKey, model_variant: &str, use_host_theory: bool) -> ParamKey {
    if use_host_theory {
        translate_to_host_theory(key, model_variant)
    } else {
        key.clone()
    }
}
