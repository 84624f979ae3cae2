//! Sampled (tabulated) field source.
use super::{lab_points, FieldSource};
use crate::{
    error::{WiseError, WiseResult},
    mirror::height_profile::parse_numbers,
    propagation::{huygens::huygens_integral, wavefront::Wavefront},
    utils::{interpolation::interp_linear, linspace},
};
use kahan::KahanSummator;
use nalgebra::Point2;
use num::complex::Complex64;
use std::{f64::consts::SQRT_2, fs, path::Path};
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::meter,
};

/// FWHM of a Gaussian in units of its rms size.
const FWHM_PER_SIGMA: f64 = 2.355;

/// A complex field sampled along the transverse axis of the source.
///
/// The field at arbitrary lab coordinates is obtained by propagating the sampled field with the Huygens
/// integral. A tabulated source can thus be the result of a previous propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedSource {
    wavelength: f64,
    field: Vec<Complex64>,
    abscissas: Vec<f64>,
    origin: Point2<f64>,
    theta: f64,
}
impl TabulatedSource {
    /// Creates a new [`TabulatedSource`].
    ///
    /// `abscissas` are the positions (in meters) of the field samples along the transverse axis, measured from
    /// `origin`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the wavelength is not positive and finite.
    ///   - the field is empty or its length differs from the number of abscissas.
    ///   - the abscissas are not finite and strictly increasing.
    ///   - the field contains non-finite values.
    ///   - origin or direction are not finite.
    pub fn new(
        wavelength: Length,
        field: Vec<Complex64>,
        abscissas: Vec<f64>,
        origin: Point2<Length>,
        theta: Angle,
    ) -> WiseResult<Self> {
        Self::from_lab_samples(
            wavelength,
            field,
            abscissas,
            Point2::new(origin.x.get::<meter>(), origin.y.get::<meter>()),
            theta,
        )
    }
    pub(crate) fn from_lab_samples(
        wavelength: Length,
        field: Vec<Complex64>,
        abscissas: Vec<f64>,
        origin: Point2<f64>,
        theta: Angle,
    ) -> WiseResult<Self> {
        let wavelength = wavelength.get::<meter>();
        let theta = theta.get::<radian>();
        if !wavelength.is_normal() || wavelength.is_sign_negative() {
            return Err(WiseError::Configuration(
                "wavelength must be > 0.0 and finite".into(),
            ));
        }
        if field.is_empty() || field.len() != abscissas.len() {
            return Err(WiseError::Configuration(
                "tabulated field must be non-empty and match the number of abscissas".into(),
            ));
        }
        if abscissas.iter().any(|a| !a.is_finite()) || abscissas.windows(2).any(|w| w[1] <= w[0]) {
            return Err(WiseError::Configuration(
                "abscissas must be finite and strictly increasing".into(),
            ));
        }
        if field.iter().any(|e| !e.is_finite()) {
            return Err(WiseError::Configuration(
                "tabulated field contains non-finite values".into(),
            ));
        }
        if !origin.x.is_finite() || !origin.y.is_finite() || !theta.is_finite() {
            return Err(WiseError::Configuration(
                "source origin and direction must be finite".into(),
            ));
        }
        Ok(Self {
            wavelength,
            field,
            abscissas,
            origin,
            theta,
        })
    }
    /// Read a [`TabulatedSource`] from a text file with the columns abscissa (meters), real and imaginary part of
    /// the field. Lines starting with `#` are ignored.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or parsed or the data is invalid
    /// (see [`TabulatedSource::new`]).
    pub fn from_file(
        path: &Path,
        wavelength: Length,
        origin: Point2<Length>,
        theta: Angle,
    ) -> WiseResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            WiseError::Io(format!("cannot read file {} : {}", path.display(), e))
        })?;
        Self::from_string(&contents, wavelength, origin, theta)
    }
    /// Parse a [`TabulatedSource`] from the content of a field file (see [`TabulatedSource::from_file`]).
    ///
    /// # Errors
    ///
    /// This function will return an error if the content cannot be parsed or the data is invalid.
    pub fn from_string(
        contents: &str,
        wavelength: Length,
        origin: Point2<Length>,
        theta: Angle,
    ) -> WiseResult<Self> {
        let values = parse_numbers(contents)?;
        if values.len() % 3 != 0 {
            return Err(WiseError::Io(
                "field data must consist of (abscissa, real, imaginary) triples".into(),
            ));
        }
        let (abscissas, field) = values
            .chunks_exact(3)
            .map(|row| (row[0], Complex64::new(row[1], row[2])))
            .unzip();
        Self::new(wavelength, field, abscissas, origin, theta)
    }
    /// Creates a [`TabulatedSource`] from the detector field of a propagation result.
    ///
    /// The source is centered on the detector center, its transverse axis runs along the detector line and the
    /// abscissas are the detector arc positions relative to the detector center.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront has no detector data or less than two detector samples.
    pub fn from_wavefront(wavefront: &Wavefront) -> WiseResult<Self> {
        let detector = wavefront.detector().ok_or_else(|| {
            WiseError::MissingInput("wavefront does not contain a detector field".into())
        })?;
        let n = detector.x.len();
        if n < 2 {
            return Err(WiseError::Configuration(
                "at least two detector samples are needed to build a source".into(),
            ));
        }
        let first = Point2::new(detector.x[0], detector.y[0]);
        let last = Point2::new(detector.x[n - 1], detector.y[n - 1]);
        let axis = (last - first).normalize();
        let origin = nalgebra::center(&first, &last);
        let half = 0.5 * detector.s[n - 1];
        let abscissas = detector.s.iter().map(|s| s - half).collect();
        Self::from_lab_samples(
            wavefront.wavelength(),
            detector.field.clone(),
            abscissas,
            origin,
            Angle::new::<radian>((-axis.x).atan2(axis.y)),
        )
    }
    /// Multiply the abscissas by a units converter (user units to meters).
    ///
    /// # Errors
    ///
    /// This function will return an error if `factor` is not positive and finite.
    pub fn with_units_converter(mut self, factor: f64) -> WiseResult<Self> {
        if !factor.is_normal() || factor.is_sign_negative() {
            return Err(WiseError::Configuration(
                "units converter must be > 0.0 and finite".into(),
            ));
        }
        self.abscissas.iter_mut().for_each(|a| *a *= factor);
        Ok(self)
    }
    /// Scale the field such that the peak intensity equals `normalization`.
    ///
    /// # Errors
    ///
    /// This function will return an error if `normalization` is not positive and finite or the field is zero.
    pub fn normalized(mut self, normalization: f64) -> WiseResult<Self> {
        if !normalization.is_normal() || normalization.is_sign_negative() {
            return Err(WiseError::Configuration(
                "normalization factor must be > 0.0 and finite".into(),
            ));
        }
        let max_intensity = self.field.iter().map(Complex64::norm_sqr).fold(0.0, f64::max);
        if max_intensity == 0.0 {
            return Err(WiseError::Configuration(
                "cannot normalize a zero field".into(),
            ));
        }
        let factor = (normalization / max_intensity).sqrt();
        self.field.iter_mut().for_each(|e| *e *= factor);
        Ok(self)
    }
    /// Drop the phase of the field, keeping its amplitude.
    #[must_use]
    pub fn with_reset_phase(mut self) -> Self {
        self.field
            .iter_mut()
            .for_each(|e| *e = Complex64::new(e.norm(), 0.0));
        self
    }
    /// Returns the sampled field.
    #[must_use]
    pub fn field(&self) -> &[Complex64] {
        &self.field
    }
    /// Returns the sample positions along the transverse axis (meters).
    #[must_use]
    pub fn abscissas(&self) -> &[f64] {
        &self.abscissas
    }
    /// Returns the sampled intensity.
    #[must_use]
    pub fn intensity(&self) -> Vec<f64> {
        self.field.iter().map(Complex64::norm_sqr).collect()
    }
    /// Estimate of the beam size, the FWHM of a Gaussian with the rms size of the sampled intensity.
    ///
    /// Returns zero for a zero field.
    #[must_use]
    pub fn waist_estimate(&self) -> Length {
        let intensity = self.intensity();
        let total: f64 = intensity.iter().kahan_sum().sum();
        if total <= 0.0 {
            return Length::new::<meter>(0.0);
        }
        let moment: f64 = intensity
            .iter()
            .zip(&self.abscissas)
            .map(|(i, a)| i * a)
            .kahan_sum()
            .sum();
        let mean = moment / total;
        let second_moment: f64 = intensity
            .iter()
            .zip(&self.abscissas)
            .map(|(i, a)| i * (a - mean) * (a - mean))
            .kahan_sum()
            .sum();
        let variance = second_moment / total;
        Length::new::<meter>(FWHM_PER_SIGMA * variance.sqrt())
    }
    /// Linear interpolation of the field at the given abscissas, zero outside the tabulated range.
    fn interpolated(&self, abscissas: &[f64]) -> Vec<Complex64> {
        let first = self.abscissas[0];
        let last = self.abscissas[self.abscissas.len() - 1];
        let (re, im): (Vec<f64>, Vec<f64>) = self.field.iter().map(|e| (e.re, e.im)).unzip();
        abscissas
            .iter()
            .map(|a| {
                if *a < first || *a > last {
                    Complex64::new(0.0, 0.0)
                } else {
                    Complex64::new(
                        interp_linear(&self.abscissas, &re, *a),
                        interp_linear(&self.abscissas, &im, *a),
                    )
                }
            })
            .collect()
    }
}
impl FieldSource for TabulatedSource {
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
        self.waist_estimate()
    }
    fn set_placement(&mut self, origin: Point2<f64>, direction: Angle) {
        self.origin = origin;
        self.theta = direction.get::<radian>();
    }
    fn evaluate_field(
        &self,
        x: &[f64],
        y: &[f64],
        workers: usize,
    ) -> WiseResult<Vec<Complex64>> {
        let (x_in, y_in) = lab_points(self.origin, self.transverse_axis(), &self.abscissas);
        huygens_integral(self.wavelength, &self.field, &x_in, &y_in, x, y, workers)
    }
    /// Resample the field on its own transverse axis over `±5·waist/√2`.
    ///
    /// Samples are interpolated linearly, positions outside the tabulated range get a zero field.
    fn tabulate(&self, n: usize, _workers: usize) -> WiseResult<Self> {
        let half = 5.0 * self.waist_estimate().get::<meter>() / SQRT_2;
        let abscissas = linspace(-half, half, n);
        let field = self.interpolated(&abscissas);
        Self::from_lab_samples(
            self.wavelength(),
            field,
            abscissas,
            self.origin,
            self.direction(),
        )
    }
}
