//! Known data block locations.
//!
//! Producers (the bridge) and consumers (pipeline modules) must agree on the
//! shape stored at each of these keys. The table is closed: adding or
//! changing an entry bumps [`SCHEMA_VERSION`]. Keys outside the table (for
//! example pipeline parameters) are unconstrained.

pub const SCHEMA_VERSION: u32 = 1;

pub const COSMOLOGICAL_PARAMETERS: &str = "cosmological_parameters";
pub const HALO_MODEL_PARAMETERS: &str = "halo_model_parameters";
pub const DISTANCES: &str = "distances";
pub const MATTER_POWER_LIN: &str = "matter_power_lin";
pub const MATTER_POWER_NL: &str = "matter_power_nl";
pub const LIKELIHOODS: &str = "likelihoods";

/// Scalar result the bridge returns from each evaluation.
pub const LOGLIKE_KEY: &str = "loglike_like";

/// Axis and value names of the power-spectrum grids.
pub const PK_Z: &str = "z";
pub const PK_K_H: &str = "k_h";
pub const PK_VALUE: &str = "p_k";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Vector,
    Grid,
}

impl ValueShape {
    pub fn label(self) -> &'static str {
        match self {
            ValueShape::Scalar => "scalar",
            ValueShape::Vector => "vector",
            ValueShape::Grid => "grid",
        }
    }
}

/// `(section, key, shape)` of every location the bridge reads or writes.
pub const KNOWN_KEYS: &[(&str, &str, ValueShape)] = &[
    (COSMOLOGICAL_PARAMETERS, "h", ValueShape::Scalar),
    (COSMOLOGICAL_PARAMETERS, "h0", ValueShape::Scalar),
    (COSMOLOGICAL_PARAMETERS, "omega_m", ValueShape::Scalar),
    (DISTANCES, "z", ValueShape::Vector),
    (DISTANCES, "a", ValueShape::Vector),
    (DISTANCES, "d_m", ValueShape::Vector),
    (MATTER_POWER_LIN, PK_VALUE, ValueShape::Grid),
    (MATTER_POWER_NL, PK_VALUE, ValueShape::Grid),
    (LIKELIHOODS, LOGLIKE_KEY, ValueShape::Scalar),
];

/// Shape required at a known location, `None` for unconstrained keys.
pub fn expected_shape(section: &str, key: &str) -> Option<ValueShape> {
    KNOWN_KEYS
        .iter()
        .find(|(s, k, _)| *s == section && *k == key)
        .map(|&(_, _, shape)| shape)
}
