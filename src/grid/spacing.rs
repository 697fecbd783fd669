//! Point sequences.

use crate::error::{BridgeError, Result};

/// `n` evenly spaced points from `start` towards `stop`.
///
/// With `endpoint` the last point is exactly `stop`; without it the interval
/// is half-open and `stop` is excluded.
pub fn linspace(start: f64, stop: f64, n: usize, endpoint: bool) -> Vec<f64> {
    match n {
        0 => return Vec::new(),
        1 => return vec![start],
        _ => {}
    }
    let intervals = (if endpoint { n - 1 } else { n }) as f64;
    let step = (stop - start) / intervals;

    let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    if endpoint {
        out[n - 1] = stop;
    }
    out
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(BridgeError::InvalidGrid(format!(
            "log range min={min}, max={max} must be finite, >0, and max>min"
        )));
    }
    if steps < 2 {
        return Err(BridgeError::InvalidGrid("log grid needs at least 2 points".to_string()));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_with_and_without_endpoint() {
        let closed = linspace(0.0, 1.0, 5, true);
        assert_eq!(closed, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let open = linspace(0.0, 1.0, 4, false);
        assert_eq!(open, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(1e-5, 10.0, 200).unwrap();
        assert_eq!(v.len(), 200);
        assert!((v[0] - 1e-5).abs() < 1e-17);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-9);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn log_space_rejects_bad_range() {
        assert!(log_space(0.0, 1.0, 10).is_err());
        assert!(log_space(1.0, 1.0, 10).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
    }
}
