#![warn(missing_docs)]
//! Coherent 1-D field sources.
//!
//! A source is placed in the lab frame by its origin and the direction angle `theta` of its optical axis. Its
//! transverse axis is the optical axis rotated by +90°, `(-sin(theta), cos(theta))`.
mod gaussian;
mod tabulated;

pub use gaussian::GaussianSource;
pub use tabulated::TabulatedSource;

use crate::{
    error::WiseResult,
    mirror::EllipticalMirror,
    utils::linspace,
};
use log::debug;
use nalgebra::{Point2, Vector2};
use num::complex::Complex64;
use std::{f64::consts::SQRT_2, fmt::Debug};
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::meter,
};

/// Corrections applied when a source is placed at the entrance focus of a mirror.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusCorrection {
    /// shift along the incident chief ray (positive towards the mirror)
    pub longitudinal: Length,
    /// shift perpendicular to the incident chief ray
    pub transverse: Length,
    /// additional tilt of the source axis
    pub angle: Angle,
}
impl Default for FocusCorrection {
    fn default() -> Self {
        Self {
            longitudinal: Length::new::<meter>(0.0),
            transverse: Length::new::<meter>(0.0),
            angle: Angle::new::<radian>(0.0),
        }
    }
}

/// Capability of evaluating a complex scalar field at lab coordinates.
pub trait FieldSource: Debug {
    /// Returns the wavelength of this source.
    fn wavelength(&self) -> Length;
    /// Returns the origin of this source (lab frame, meters).
    fn origin(&self) -> Point2<f64>;
    /// Returns the direction angle of the optical axis of this source.
    fn direction(&self) -> Angle;
    /// Returns the (estimated) waist size of this source.
    fn waist(&self) -> Length;
    /// Move this source to a new origin and direction.
    fn set_placement(&mut self, origin: Point2<f64>, direction: Angle);
    /// Evaluate the complex field at the lab coordinates `x`, `y` (meters).
    ///
    /// `workers` is the number of threads used if the evaluation involves a diffraction integral.
    ///
    /// # Errors
    ///
    /// This function will return an error if `x` and `y` have different lengths or the field cannot be evaluated
    /// at the given points.
    fn evaluate_field(&self, x: &[f64], y: &[f64], workers: usize)
        -> WiseResult<Vec<Complex64>>;
    /// Unit vector of the transverse axis of this source.
    fn transverse_axis(&self) -> Vector2<f64> {
        let theta = self.direction().get::<radian>();
        Vector2::new(-theta.sin(), theta.cos())
    }
    /// Sample this source on its own transverse axis with `n` points over `±5·waist/√2`.
    ///
    /// # Errors
    ///
    /// This function will return an error if `n` is zero or the field evaluation fails.
    fn tabulate(&self, n: usize, workers: usize) -> WiseResult<TabulatedSource> {
        let half = 5.0 * self.waist().get::<meter>() / SQRT_2;
        let abscissas = linspace(-half, half, n);
        let (x, y) = lab_points(self.origin(), self.transverse_axis(), &abscissas);
        let field = self.evaluate_field(&x, &y, workers)?;
        TabulatedSource::from_lab_samples(
            self.wavelength(),
            field,
            abscissas,
            self.origin(),
            self.direction(),
        )
    }
    /// Place this source at the entrance focus of `mirror`, pointing at the mirror center.
    ///
    /// The corrections shift the origin along and perpendicular to the incident chief ray and tilt the source axis.
    fn locate_at_mirror_focus(&mut self, mirror: &EllipticalMirror, correction: &FocusCorrection) {
        let dir = mirror.incidence_direction();
        let perp = Vector2::new(-dir.y, dir.x);
        let origin = mirror.focus1()
            + correction.longitudinal.get::<meter>() * dir
            + correction.transverse.get::<meter>() * perp;
        let direction = Angle::new::<radian>(dir.y.atan2(dir.x)) + correction.angle;
        debug!(
            "source placed at ({}, {}) m, direction {} rad",
            origin.x,
            origin.y,
            direction.get::<radian>()
        );
        self.set_placement(origin, direction);
    }
}

/// Lab coordinates of points at the given abscissas along `axis` through `origin`.
pub(crate) fn lab_points(
    origin: Point2<f64>,
    axis: Vector2<f64>,
    abscissas: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    abscissas
        .iter()
        .map(|a| {
            let p = origin + *a * axis;
            (p.x, p.y)
        })
        .unzip()
}

/// A field source of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// analytic Gaussian beam
    Gaussian(GaussianSource),
    /// sampled field, e.g. the result of a previous propagation
    Tabulated(TabulatedSource),
}
impl From<GaussianSource> for Source {
    fn from(source: GaussianSource) -> Self {
        Self::Gaussian(source)
    }
}
impl From<TabulatedSource> for Source {
    fn from(source: TabulatedSource) -> Self {
        Self::Tabulated(source)
    }
}
impl FieldSource for Source {
    fn wavelength(&self) -> Length {
        match self {
            Self::Gaussian(s) => s.wavelength(),
            Self::Tabulated(s) => s.wavelength(),
        }
    }
    fn origin(&self) -> Point2<f64> {
        match self {
            Self::Gaussian(s) => s.origin(),
            Self::Tabulated(s) => s.origin(),
        }
    }
    fn direction(&self) -> Angle {
        match self {
            Self::Gaussian(s) => s.direction(),
            Self::Tabulated(s) => s.direction(),
        }
    }
    fn waist(&self) -> Length {
        match self {
            Self::Gaussian(s) => s.waist(),
            Self::Tabulated(s) => s.waist(),
        }
    }
    fn set_placement(&mut self, origin: Point2<f64>, direction: Angle) {
        match self {
            Self::Gaussian(s) => s.set_placement(origin, direction),
            Self::Tabulated(s) => s.set_placement(origin, direction),
        }
    }
    fn evaluate_field(
        &self,
        x: &[f64],
        y: &[f64],
        workers: usize,
    ) -> WiseResult<Vec<Complex64>> {
        match self {
            Self::Gaussian(s) => s.evaluate_field(x, y, workers),
            Self::Tabulated(s) => s.evaluate_field(x, y, workers),
        }
    }
    fn tabulate(&self, n: usize, workers: usize) -> WiseResult<TabulatedSource> {
        match self {
            Self::Gaussian(s) => s.tabulate(n, workers),
            Self::Tabulated(s) => s.tabulate(n, workers),
        }
    }
}
