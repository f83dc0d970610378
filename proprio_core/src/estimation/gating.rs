// proprio_core/src/estimation/gating.rs

use tracing::error;

/// Chi-square critical values at 5% significance for 1 to 9 degrees of freedom.
const CHI2_95: [f64; 9] = [3.84, 5.99, 7.81, 9.49, 11.07, 12.59, 14.07, 15.51, 16.92];

/// Accepts a measurement whose squared Mahalanobis distance is below the 5% critical
/// value for `dof` degrees of freedom.
///
/// Only 1 to 9 degrees of freedom are tabulated. Anything else is logged and rejected.
pub fn accept_mahalanobis_distance(mahalanobis2: f64, dof: usize) -> bool {
    match dof.checked_sub(1).and_then(|i| CHI2_95.get(i)) {
        Some(threshold) => mahalanobis2 < *threshold,
        None => {
            error!(dof, "Mahalanobis gate: degrees of freedom not supported");
            false
        }
    }
}

/// A gate that lets every measurement through.
pub fn accept_any_mahalanobis_distance(_mahalanobis2: f64, _dof: usize) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_dof_threshold() {
        assert!(accept_mahalanobis_distance(7.80, 3));
        assert!(!accept_mahalanobis_distance(7.82, 3));
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!accept_mahalanobis_distance(3.84, 1));
        assert!(accept_mahalanobis_distance(16.91, 9));
    }

    #[test]
    fn test_unsupported_dof_rejects() {
        assert!(!accept_mahalanobis_distance(0.0, 0));
        assert!(!accept_mahalanobis_distance(0.0, 10));
    }

    #[test]
    fn test_accept_any() {
        assert!(accept_any_mahalanobis_distance(1e9, 42));
    }
}
