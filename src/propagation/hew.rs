//! Half energy width (HEW) of a sampled intensity profile.
//!
//! Every sample `i` is treated as a bin `[i, i+1)` (in units of the sample step) with a uniform intensity
//! density. The HEW is the width of the narrowest continuous window containing half of the total intensity.
//! Window ends may lie inside a bin, in which case the bin contributes proportionally to its covered fraction.
//!
//! For a piecewise constant density, the narrowest window always has at least one end on a bin edge. All windows
//! starting at a bin edge and all windows ending at a bin edge are scanned.
use crate::{
    error::{WiseError, WiseResult},
    utils::{mean_step, usize_to_f64},
};
use kahan::KahanSummator;

/// Compute the half energy width of an intensity profile sampled at a constant `step`.
///
/// The result has the unit of `step`.
///
/// # Errors
///
/// This function will return an error if
///   - the intensity profile is empty or contains negative values.
///   - `step` is not positive and finite.
///   - the total intensity is zero.
///   - the profile contains non-finite values or its sum overflows ([`WiseError::IntegrationInstability`]).
pub fn half_energy_width(intensity: &[f64], step: f64) -> WiseResult<f64> {
    if intensity.is_empty() {
        return Err(WiseError::Configuration(
            "cannot compute the HEW of an empty intensity profile".into(),
        ));
    }
    if intensity.iter().any(|i| !i.is_finite()) {
        return Err(WiseError::integration_instability());
    }
    if intensity.iter().any(|i| *i < 0.0) {
        return Err(WiseError::Configuration(
            "intensity profile contains negative values".into(),
        ));
    }
    if !step.is_normal() || step.is_sign_negative() {
        return Err(WiseError::Configuration(
            "HEW sample step must be > 0.0 and finite".into(),
        ));
    }
    let total: f64 = intensity.iter().kahan_sum().sum();
    if total <= 0.0 {
        return Err(WiseError::Configuration(
            "total intensity is zero, cannot compute the HEW".into(),
        ));
    }
    let n = intensity.len();
    let mut cumulated = Vec::with_capacity(n + 1);
    cumulated.push(0.0);
    for i in intensity {
        cumulated.push(cumulated[cumulated.len() - 1] + i);
    }
    if !cumulated[n].is_finite() {
        return Err(WiseError::integration_instability());
    }
    let half = 0.5 * cumulated[n];
    let mut width = f64::INFINITY;
    // windows starting at bin edge k
    for k in 0..n {
        let target = cumulated[k] + half;
        let end = cumulated.partition_point(|c| *c < target);
        if end > n {
            break;
        }
        let bin = end - 1;
        let right = usize_to_f64(bin) + (target - cumulated[bin]) / intensity[bin];
        width = width.min(right - usize_to_f64(k));
    }
    // windows ending at bin edge m
    for m in (1..=n).rev() {
        let target = cumulated[m] - half;
        if target < 0.0 {
            break;
        }
        let start = cumulated.partition_point(|c| *c <= target);
        let bin = start - 1;
        let left = usize_to_f64(start) - (cumulated[start] - target) / intensity[bin];
        width = width.min(usize_to_f64(m) - left);
    }
    Ok(width * step)
}

/// Compute the half energy width of an intensity profile at the given positions.
///
/// The sample step is the mean spacing of the positions.
///
/// # Errors
///
/// This function will return an error if less than two positions are given, the number of positions does not
/// match the intensity profile or the HEW computation fails (see [`half_energy_width`]).
pub fn half_energy_width_at(intensity: &[f64], positions: &[f64]) -> WiseResult<f64> {
    if intensity.len() != positions.len() {
        return Err(WiseError::Configuration(
            "intensity profile and positions must have equal length".into(),
        ));
    }
    let step = mean_step(positions).ok_or_else(|| {
        WiseError::Configuration("at least two samples are needed to compute the HEW".into())
    })?;
    half_energy_width(intensity, step)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::linspace;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use assert_matches::assert_matches;

    #[test]
    fn flat_top() {
        for (n, step) in [(10, 1.0), (101, 0.5), (400, 1e-7)] {
            let hew = half_energy_width(&vec![3.0; n], step).unwrap();
            assert_relative_eq!(hew, 0.5 * usize_to_f64(n) * step, max_relative = 1e-12);
        }
    }
    #[test]
    fn flat_top_with_background_zeros() {
        let mut intensity = vec![0.0; 100];
        intensity[30..70].iter_mut().for_each(|i| *i = 1.0);
        assert_abs_diff_eq!(half_energy_width(&intensity, 0.1).unwrap(), 2.0, epsilon = 1e-12);
    }
    #[test]
    fn single_peak() {
        let mut intensity = vec![0.0; 11];
        intensity[5] = 4.0;
        assert_abs_diff_eq!(half_energy_width(&intensity, 2.0).unwrap(), 1.0);
        assert_abs_diff_eq!(half_energy_width(&[1.0], 1.0).unwrap(), 0.5);
    }
    #[test]
    fn narrowest_window() {
        // a narrow dense part and a broad faint part: half of the energy is in the dense part
        let intensity = [1.0, 1.0, 1.0, 1.0, 8.0, 0.0];
        assert_abs_diff_eq!(half_energy_width(&intensity, 1.0).unwrap(), 0.75);
    }
    #[test]
    fn gaussian() {
        let sigma = 1.0;
        let x = linspace(-10.0, 10.0, 2001);
        let intensity: Vec<f64> = x.iter().map(|x| (-(x * x) / (2.0 * sigma * sigma)).exp()).collect();
        let hew = half_energy_width_at(&intensity, &x).unwrap();
        assert_relative_eq!(hew, 2.0 * 0.674_489_75 * sigma, max_relative = 1e-3);
    }
    #[test]
    fn deterministic() {
        let intensity: Vec<f64> = (0..50).map(|i| f64::from(i % 7) + 0.5).collect();
        let a = half_energy_width(&intensity, 0.3).unwrap();
        let b = half_energy_width(&intensity, 0.3).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }
    #[test]
    fn errors() {
        assert_matches!(half_energy_width(&[], 1.0), Err(WiseError::Configuration(_)));
        assert_matches!(
            half_energy_width(&[0.0, 0.0], 1.0),
            Err(WiseError::Configuration(_))
        );
        assert_matches!(
            half_energy_width(&[1.0, -1.0], 1.0),
            Err(WiseError::Configuration(_))
        );
        assert_matches!(
            half_energy_width(&[1.0, 1.0], 0.0),
            Err(WiseError::Configuration(_))
        );
        assert_eq!(
            half_energy_width(&[1.0, f64::NAN], 1.0),
            Err(WiseError::integration_instability())
        );
        assert_eq!(
            half_energy_width(&[1.0, f64::INFINITY], 1.0),
            Err(WiseError::integration_instability())
        );
        assert!(half_energy_width(&[1.0, f64::NAN], 1.0)
            .unwrap_err()
            .is_configuration());
        assert_matches!(
            half_energy_width_at(&[1.0], &[0.0]),
            Err(WiseError::Configuration(_))
        );
        assert_matches!(
            half_energy_width_at(&[1.0, 2.0], &[0.0]),
            Err(WiseError::Configuration(_))
        );
    }
    #[test]
    fn overflowing_total_intensity() {
        assert_eq!(
            half_energy_width(&[1e308, 1e308], 1.0),
            Err(WiseError::integration_instability())
        );
        assert_eq!(
            half_energy_width(&[f64::MAX, f64::MAX, 1.0], 0.5),
            Err(WiseError::integration_instability())
        );
        assert_abs_diff_eq!(half_energy_width(&[1e307, 1e307], 1.0).unwrap(), 1.0);
    }
}
