//! Redshift grids.
//!
//! Power spectra are requested on a descending grid that can be built from
//! two linear segments: a dense one over `[zmin, zmid)` and a coarser one
//! over `[zmid, zmax]`. Distances use a single linear segment. Grids are
//! computed once per bridge and reused for every evaluation.

use crate::error::{BridgeError, Result};
use crate::grid::spacing::linspace;

/// Strictly decreasing sequence of redshifts.
#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftGrid {
    descending: Vec<f64>,
}

impl RedshiftGrid {
    /// Single linear segment over `[zmin, zmax]` with `nz` points.
    pub fn linear(zmin: f64, zmax: f64, nz: usize) -> Result<Self> {
        check_range(zmin, zmax, nz)?;
        let mut z = linspace(zmin, zmax, nz, true);
        z.reverse();
        Self::from_descending(z)
    }

    /// Two segments: `nz_mid` points over `[zmin, zmid)`, the remaining
    /// `nz - nz_mid` over `[zmid, zmax]`. A single upper point sits at `zmid`.
    pub fn two_segment(zmin: f64, zmid: f64, zmax: f64, nz: usize, nz_mid: usize) -> Result<Self> {
        check_range(zmin, zmax, nz)?;
        if !(zmid.is_finite() && zmin < zmid && zmid < zmax) {
            return Err(BridgeError::InvalidGrid(format!(
                "zmid={zmid} must lie strictly inside ({zmin}, {zmax})"
            )));
        }
        if nz_mid == 0 || nz <= nz_mid {
            return Err(BridgeError::InvalidGrid(format!(
                "nz_mid={nz_mid} must be >= 1 and leave at least 1 of nz={nz} points from zmid up"
            )));
        }

        let mut z = linspace(zmin, zmid, nz_mid, false);
        z.extend(linspace(zmid, zmax, nz - nz_mid, true));
        z.reverse();
        Self::from_descending(z)
    }

    /// `two_segment` when `zmid` is set, `linear` otherwise.
    pub fn build(zmin: f64, zmid: Option<f64>, zmax: f64, nz: usize, nz_mid: usize) -> Result<Self> {
        match zmid {
            Some(zmid) => Self::two_segment(zmin, zmid, zmax, nz, nz_mid),
            None => Self::linear(zmin, zmax, nz),
        }
    }

    fn from_descending(descending: Vec<f64>) -> Result<Self> {
        if descending.windows(2).any(|w| w[1] >= w[0]) {
            return Err(BridgeError::InvalidGrid(
                "redshift grid is not strictly decreasing".to_string(),
            ));
        }
        Ok(Self { descending })
    }

    /// Redshifts, highest first.
    pub fn descending(&self) -> &[f64] {
        &self.descending
    }

    /// Redshifts, lowest first.
    pub fn ascending(&self) -> Vec<f64> {
        self.descending.iter().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.descending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descending.is_empty()
    }
}

fn check_range(zmin: f64, zmax: f64, nz: usize) -> Result<()> {
    if !(zmin.is_finite() && zmax.is_finite() && zmin >= 0.0 && zmax > zmin) {
        return Err(BridgeError::InvalidGrid(format!(
            "zmin={zmin}, zmax={zmax} must be finite with 0 <= zmin < zmax"
        )));
    }
    if nz < 2 {
        return Err(BridgeError::InvalidGrid(format!("nz={nz} must be >= 2")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn linear_grid_is_descending_with_exact_ends() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let zmin = rng.gen_range(0.0..1.0);
            let zmax = zmin + rng.gen_range(0.01..5.0);
            let nz = rng.gen_range(2..400);

            let grid = RedshiftGrid::linear(zmin, zmax, nz).unwrap();
            let z = grid.descending();
            assert_eq!(z.len(), nz);
            assert!(z.windows(2).all(|w| w[1] < w[0]));
            assert!((z[0] - zmax).abs() < 1e-12);
            assert!((z[nz - 1] - zmin).abs() < 1e-12);
        }
    }

    #[test]
    fn two_segment_grid_is_dense_below_zmid() {
        let grid = RedshiftGrid::two_segment(0.0, 1.0, 3.0, 150, 100).unwrap();
        let z = grid.ascending();
        assert_eq!(z.len(), 150);
        assert!(z.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(z[0], 0.0);
        assert_eq!(z[149], 3.0);
        // zmid starts the coarse segment.
        assert!((z[100] - 1.0).abs() < 1e-12);
        let dense = z[1] - z[0];
        let coarse = z[101] - z[100];
        assert!((dense - 0.01).abs() < 1e-12);
        assert!((coarse - 2.0 / 49.0).abs() < 1e-12);
    }

    #[test]
    fn single_point_upper_segment_is_zmid() {
        let grid = RedshiftGrid::two_segment(0.0, 1.0, 3.0, 101, 100).unwrap();
        let z = grid.descending();
        assert_eq!(z.len(), 101);
        assert_eq!(z[0], 1.0);
        assert!(z.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(z[100], 0.0);
    }

    #[test]
    fn build_picks_segments_from_zmid() {
        let one = RedshiftGrid::build(0.0, None, 3.01, 150, 100).unwrap();
        assert_eq!(one, RedshiftGrid::linear(0.0, 3.01, 150).unwrap());
        let two = RedshiftGrid::build(0.0, Some(1.0), 3.01, 150, 100).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(RedshiftGrid::linear(1.0, 1.0, 10).is_err());
        assert!(RedshiftGrid::linear(0.0, 1.0, 1).is_err());
        assert!(RedshiftGrid::two_segment(0.0, 4.0, 3.0, 150, 100).is_err());
        assert!(RedshiftGrid::two_segment(0.0, 1.0, 3.0, 100, 100).is_err());
        assert!(RedshiftGrid::two_segment(0.0, 1.0, 3.0, 100, 0).is_err());
    }
}
