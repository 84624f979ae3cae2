//! Analytic 1-D Gaussian beam.
use super::FieldSource;
use crate::error::{WiseError, WiseResult};
use nalgebra::Point2;
use num::complex::Complex64;
use std::f64::consts::PI;
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::meter,
};

/// A coherent Gaussian beam with its waist located at the source origin.
///
/// In the local frame of the source (`z` along the optical axis, `r` along the transverse axis) the field is
///
/// `E = sqrt(w0/w(z)) · exp(-r²/w(z)²) · exp(-i·(k·z + k·r²/(2·R(z)) - atan(z/zR)/2))`
///
/// with the Rayleigh range `zR = π·w0²/λ`, the beam size `w(z) = w0·sqrt(1 + (z/zR)²)` and the wavefront radius
/// `R(z) = z·(1 + (zR/z)²)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianSource {
    wavelength: f64,
    waist: f64,
    origin: Point2<f64>,
    theta: f64,
}
impl GaussianSource {
    /// Creates a new [`GaussianSource`].
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the wavelength or the waist are not positive and finite.
    ///   - the origin or the direction angle are not finite.
    pub fn new(
        wavelength: Length,
        waist: Length,
        origin: Point2<Length>,
        theta: Angle,
    ) -> WiseResult<Self> {
        let wavelength = wavelength.get::<meter>();
        let waist = waist.get::<meter>();
        let origin = Point2::new(origin.x.get::<meter>(), origin.y.get::<meter>());
        let theta = theta.get::<radian>();
        if !wavelength.is_normal() || wavelength.is_sign_negative() {
            return Err(WiseError::Configuration(
                "wavelength must be > 0.0 and finite".into(),
            ));
        }
        if !waist.is_normal() || waist.is_sign_negative() {
            return Err(WiseError::Configuration(
                "waist must be > 0.0 and finite".into(),
            ));
        }
        if !origin.x.is_finite() || !origin.y.is_finite() || !theta.is_finite() {
            return Err(WiseError::Configuration(
                "source origin and direction must be finite".into(),
            ));
        }
        Ok(Self {
            wavelength,
            waist,
            origin,
            theta,
        })
    }
    /// Creates a new [`GaussianSource`] from the rms size `sigma` of its intensity profile at the waist.
    ///
    /// The waist (`1/e²` intensity radius) is `2·sigma`.
    ///
    /// # Errors
    ///
    /// see [`GaussianSource::new`]
    pub fn from_sigma(
        wavelength: Length,
        sigma: Length,
        origin: Point2<Length>,
        theta: Angle,
    ) -> WiseResult<Self> {
        Self::new(wavelength, 2.0 * sigma, origin, theta)
    }
    /// Returns the rms size of the intensity profile at the waist.
    #[must_use]
    pub fn sigma(&self) -> Length {
        Length::new::<meter>(0.5 * self.waist)
    }
    /// Returns the Rayleigh range of this beam.
    #[must_use]
    pub fn rayleigh_range(&self) -> Length {
        Length::new::<meter>(self.rayleigh_range_m())
    }
    fn rayleigh_range_m(&self) -> f64 {
        PI * self.waist * self.waist / self.wavelength
    }
    /// Beam size `w(z)` at the distance `z` from the waist.
    #[must_use]
    pub fn beam_size_at(&self, z: Length) -> Length {
        let z_r = self.rayleigh_range_m();
        Length::new::<meter>(self.waist * (z.get::<meter>() / z_r).hypot(1.0))
    }
    /// Converts lab coordinates into local (longitudinal, transverse) coordinates of this source.
    #[must_use]
    pub fn local_coordinates(&self, x: f64, y: f64) -> (f64, f64) {
        let (sin, cos) = self.theta.sin_cos();
        let dx = x - self.origin.x;
        let dy = y - self.origin.y;
        (dx.mul_add(cos, dy * sin), dy.mul_add(cos, -dx * sin))
    }
    /// Field at local coordinates `z` (along the optical axis) and `r` (transverse).
    #[must_use]
    pub fn field_local(&self, z: f64, r: f64) -> Complex64 {
        let k = 2.0 * PI / self.wavelength;
        let z_r = self.rayleigh_range_m();
        let w = self.waist * (z / z_r).hypot(1.0);
        let amplitude = (self.waist / w).sqrt() * (-(r * r) / (w * w)).exp();
        // k·r²/(2R) written without the singular R(z=0)
        let curvature = k * r * r * z / (2.0 * z.mul_add(z, z_r * z_r));
        let gouy = 0.5 * (z / z_r).atan();
        Complex64::from_polar(amplitude, -(k.mul_add(z, curvature) - gouy))
    }
}
impl FieldSource for GaussianSource {
    fn wavelength(&self) -> Length {
        Length::new::<meter>(self.wavelength)
    }
    fn origin(&self) -> Point2<f64> {
        self.origin
    }
    fn direction(&self) -> Angle {
        Angle::new::<radian>(self.theta)
    }
    fn waist(&self) -> Length {
        Length::new::<meter>(self.waist)
    }
    fn set_placement(&mut self, origin: Point2<f64>, direction: Angle) {
        self.origin = origin;
        self.theta = direction.get::<radian>();
    }
    fn evaluate_field(
        &self,
        x: &[f64],
        y: &[f64],
        _workers: usize,
    ) -> WiseResult<Vec<Complex64>> {
        if x.len() != y.len() {
            return Err(WiseError::Configuration(
                "x and y coordinates must have equal length".into(),
            ));
        }
        Ok(x.iter()
            .zip(y)
            .map(|(x, y)| {
                let (z, r) = self.local_coordinates(*x, *y);
                self.field_local(z, r)
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{degree, meter, micrometer, nanometer, radian, utils::linspace};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use assert_matches::assert_matches;
    use kahan::KahanSummator;

    fn source() -> GaussianSource {
        GaussianSource::new(nanometer!(1.0), micrometer!(20.0), meter!(0.0, 0.0), radian!(0.0))
            .unwrap()
    }
    #[test]
    fn new() {
        let s = source();
        assert_eq!(s.wavelength(), nanometer!(1.0));
        assert_eq!(s.waist(), micrometer!(20.0));
        assert_eq!(s.origin(), Point2::new(0.0, 0.0));
        assert_eq!(s.direction(), radian!(0.0));
        assert_abs_diff_eq!(s.sigma().get::<meter>(), 10e-6);
    }
    #[test]
    fn new_wrong() {
        let o = meter!(0.0, 0.0);
        let t = radian!(0.0);
        assert_matches!(
            GaussianSource::new(nanometer!(0.0), micrometer!(20.0), o, t),
            Err(WiseError::Configuration(_))
        );
        assert_matches!(
            GaussianSource::new(nanometer!(1.0), micrometer!(-20.0), o, t),
            Err(WiseError::Configuration(_))
        );
        assert_matches!(
            GaussianSource::new(nanometer!(1.0), micrometer!(20.0), meter!(f64::NAN, 0.0), t),
            Err(WiseError::Configuration(_))
        );
        assert_matches!(
            GaussianSource::new(nanometer!(1.0), micrometer!(20.0), o, radian!(f64::INFINITY)),
            Err(WiseError::Configuration(_))
        );
    }
    #[test]
    fn from_sigma() {
        let s = GaussianSource::from_sigma(nanometer!(1.0), micrometer!(5.0), meter!(0.0, 0.0), radian!(0.0))
            .unwrap();
        assert_abs_diff_eq!(s.waist().get::<meter>(), 10e-6);
        assert_abs_diff_eq!(s.sigma().get::<meter>(), 5e-6);
    }
    #[test]
    fn rayleigh_and_beam_size() {
        let s = source();
        let z_r = PI * 400e-12 / 1e-9;
        assert_relative_eq!(s.rayleigh_range().get::<meter>(), z_r, max_relative = 1e-12);
        assert_relative_eq!(
            s.beam_size_at(meter!(0.0)).get::<meter>(),
            20e-6,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            s.beam_size_at(meter!(z_r)).get::<meter>(),
            20e-6 * 2f64.sqrt(),
            max_relative = 1e-12
        );
    }
    #[test]
    fn waist_profile() {
        let s = source();
        let e = s.field_local(0.0, 0.0);
        assert_abs_diff_eq!(e.re, 1.0);
        assert_abs_diff_eq!(e.im, 0.0);
        let e = s.field_local(0.0, 20e-6);
        assert_abs_diff_eq!(e.norm(), (-1.0f64).exp(), epsilon = 1e-15);
    }
    #[test]
    fn local_coordinates() {
        let s = GaussianSource::new(
            nanometer!(1.0),
            micrometer!(20.0),
            meter!(1.0, 1.0),
            degree!(90.0),
        )
        .unwrap();
        let (z, r) = s.local_coordinates(1.0, 3.0);
        assert_abs_diff_eq!(z, 2.0, epsilon = 1e-15);
        assert_abs_diff_eq!(r, 0.0, epsilon = 1e-15);
        let (z, r) = s.local_coordinates(0.0, 1.0);
        assert_abs_diff_eq!(z, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-15);
    }
    #[test]
    fn power_conservation() {
        let s = source();
        let power_at = |z: f64| -> f64 {
            let w = s.beam_size_at(meter!(z)).get::<meter>();
            let r = linspace(-5.0 * w, 5.0 * w, 2001);
            let dr = r[1] - r[0];
            let x = vec![z; r.len()];
            s.evaluate_field(&x, &r, 0)
                .unwrap()
                .iter()
                .map(|e| e.norm_sqr() * dr)
                .kahan_sum()
                .sum()
        };
        let p0 = power_at(0.0);
        assert_relative_eq!(p0, 20e-6 * (PI / 2.0).sqrt(), max_relative = 1e-6);
        assert_relative_eq!(power_at(5.0), p0, max_relative = 1e-6);
    }
    #[test]
    fn on_axis_phase() {
        let s = source();
        let z = 0.25;
        let z_r = s.rayleigh_range().get::<meter>();
        let e = s.field_local(z, 0.0);
        let k = 2.0 * PI / 1e-9;
        let expected = Complex64::from_polar(e.norm(), -(k * z - 0.5 * (z / z_r).atan()));
        assert_abs_diff_eq!((e - expected).norm(), 0.0, epsilon = 1e-9);
    }
    #[test]
    fn evaluate_field_wrong_length() {
        assert!(source().evaluate_field(&[0.0, 1.0], &[0.0], 0).is_err());
    }
    #[test]
    fn set_placement() {
        let mut s = source();
        s.set_placement(Point2::new(1.0, 2.0), degree!(45.0));
        assert_eq!(s.origin(), Point2::new(1.0, 2.0));
        assert_abs_diff_eq!(s.direction().get::<radian>(), PI / 4.0);
    }
}
