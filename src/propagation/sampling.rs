//! Number of integration points for the mirror to detector diffraction integral.
use crate::{
    error::{WiseError, WiseResult},
    utils::f64_to_usize,
};
use log::debug;
use std::{
    f64::consts::{PI, TAU},
    fmt::Debug,
};
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::meter,
};

/// Strategy for choosing the number of mirror (and detector) samples of a propagation.
pub trait SamplingStrategy: Debug + Send + Sync {
    /// Number of samples needed to propagate light of `wavelength` from a mirror of length `mirror_length` to a
    /// detector of width `detector_size` at the distance `f2`, for the given directions of the incident and
    /// the reflected chief ray.
    ///
    /// # Errors
    ///
    /// This function will return an error if the parameters do not yield a finite, positive sample count.
    fn sample_count(
        &self,
        wavelength: Length,
        f2: Length,
        mirror_length: Length,
        detector_size: Length,
        theta_incident: Angle,
        theta_exit: Angle,
    ) -> WiseResult<usize>;
}

/// Sampling based on the number of Fresnel zones seen by the detector edges.
///
/// For a detector point at `±D/2`, the phase of the kernel varies across the mirror by `π·D·A/(λ·f2)` where
/// `A = L·sin(g)` is the mirror aperture projected perpendicular to the exit chief ray and `g` the grazing angle
/// derived from the chief ray directions. The number of samples is `oversampling` times the number of cycles
/// `D·A/(λ·f2)` but never less than `min_points`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FresnelSampling {
    /// samples per phase cycle
    pub oversampling: f64,
    /// lower bound of the sample count
    pub min_points: usize,
}
impl Default for FresnelSampling {
    fn default() -> Self {
        Self {
            oversampling: 4.0,
            min_points: 100,
        }
    }
}
impl SamplingStrategy for FresnelSampling {
    fn sample_count(
        &self,
        wavelength: Length,
        f2: Length,
        mirror_length: Length,
        detector_size: Length,
        theta_incident: Angle,
        theta_exit: Angle,
    ) -> WiseResult<usize> {
        let deviation = wrap_angle(theta_exit.get::<radian>() - theta_incident.get::<radian>());
        let grazing = 0.5 * deviation.abs();
        let aperture = mirror_length.get::<meter>() * grazing.sin();
        let raw = self.oversampling * detector_size.get::<meter>() * aperture
            / (wavelength.get::<meter>() * f2.get::<meter>());
        if !raw.is_finite() || raw <= 0.0 {
            return Err(WiseError::Configuration(
                "inconsistent source parameters".into(),
            ));
        }
        let count = f64_to_usize(raw.ceil()).max(self.min_points);
        debug!(
            "sampling: {} cycles across the mirror, {count} points",
            raw / self.oversampling
        );
        Ok(count)
    }
}

/// Wrap an angle (radians) into the interval `(-π, π]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Number of samples using the default [`FresnelSampling`] strategy.
///
/// # Errors
///
/// This function will return an error if the parameters do not yield a finite, positive sample count.
pub fn compute_sample_count(
    wavelength: Length,
    f2: Length,
    mirror_length: Length,
    detector_size: Length,
    theta_incident: Angle,
    theta_exit: Angle,
) -> WiseResult<usize> {
    FresnelSampling::default().sample_count(
        wavelength,
        f2,
        mirror_length,
        detector_size,
        theta_incident,
        theta_exit,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, micrometer, nanometer, radian};
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    #[test]
    fn default() {
        let s = FresnelSampling::default();
        assert_eq!(s.oversampling, 4.0);
        assert_eq!(s.min_points, 100);
    }
    #[test]
    fn count() {
        // 4 · 20e-6 · 0.2 · sin(0.01) / 1e-9 = 159.997
        let n = compute_sample_count(
            nanometer!(1.0),
            meter!(1.0),
            meter!(0.2),
            micrometer!(20.0),
            radian!(-0.005),
            radian!(0.015),
        )
        .unwrap();
        assert_eq!(n, 160);
    }
    #[test]
    fn grows_with_detector_size() {
        let count = |d: f64| {
            compute_sample_count(
                nanometer!(1.0),
                meter!(1.0),
                meter!(0.2),
                micrometer!(d),
                radian!(0.0),
                radian!(0.02),
            )
            .unwrap()
        };
        assert!(count(200.0) > count(100.0));
        assert_eq!(count(1.0), 100);
    }
    #[test]
    fn wrap_around() {
        let a = compute_sample_count(
            nanometer!(1.0),
            meter!(1.0),
            meter!(0.2),
            micrometer!(200.0),
            radian!(3.13),
            radian!(-3.13),
        )
        .unwrap();
        let b = compute_sample_count(
            nanometer!(1.0),
            meter!(1.0),
            meter!(0.2),
            micrometer!(200.0),
            radian!(0.0),
            radian!(2.0 * PI - 6.26),
        )
        .unwrap();
        assert_eq!(a, b);
    }
    #[test]
    fn inconsistent() {
        for (lambda, theta) in [(0.0, 0.02), (1e-9, 0.0), (f64::NAN, 0.02)] {
            assert_eq!(
                compute_sample_count(
                    meter!(lambda),
                    meter!(1.0),
                    meter!(0.2),
                    micrometer!(20.0),
                    radian!(0.0),
                    radian!(theta),
                ),
                Err(WiseError::Configuration(
                    "inconsistent source parameters".into()
                ))
            );
        }
        assert_matches!(
            FresnelSampling::default().sample_count(
                nanometer!(1.0),
                meter!(0.0),
                meter!(0.2),
                micrometer!(20.0),
                radian!(0.0),
                radian!(0.02),
            ),
            Err(WiseError::Configuration(_))
        );
    }
    #[test]
    fn wrap() {
        assert_abs_diff_eq!(wrap_angle(0.1), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(TAU + 0.1), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(-PI), PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_angle(PI), PI, epsilon = 1e-15);
    }
}
