#![warn(missing_docs)]
//! Elliptical grazing incidence mirrors.
//!
//! The mirror is a segment of an ellipse whose foci coincide with the source (entrance focus `F1`) and the
//! image (exit focus `F2`). The lab frame is the ellipse frame: the foci are located at `(-c, 0)` and `(c, 0)`,
//! the mirror lies on the lower branch (`y < 0`) and its center (the pole) is the point of the ellipse at
//! distance `f1` from `F1` and `f2` from `F2`. All lab coordinates are given in meters.
//!
//! A mirror may carry a figure error ([`HeightProfile`]) and a [`Roughness`] model. Positive heights move the
//! surface towards the inside of the ellipse along the surface normal.
pub mod height_profile;
pub mod roughness;

pub use height_profile::HeightProfile;
pub use roughness::{PowerLaw, Roughness, RoughnessSynthesizer};

use crate::{
    error::{WiseError, WiseResult},
    utils::{interpolation::interp_linear, linspace},
};
use itertools::izip;
use log::warn;
use nalgebra::{Point2, Vector2};
use std::f64::consts::FRAC_PI_2;
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::meter,
};

/// Distribution of the sampling points along the mirror surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SurfaceSpacing {
    /// points equally spaced along the ellipse abscissa
    #[default]
    UniformAbscissa,
    /// points equally spaced along the mirror arc
    UniformArcLength,
}

/// Sampled (possibly perturbed) mirror surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorSurface {
    /// lab x coordinates
    pub x: Vec<f64>,
    /// lab y coordinates
    pub y: Vec<f64>,
    /// height deviation from the nominal ellipse applied at each sample
    pub residuals: Vec<f64>,
}

/// An elliptical mirror focusing from `F1` to `F2` under grazing incidence.
#[derive(Debug, Clone)]
pub struct EllipticalMirror {
    f1: f64,
    f2: f64,
    alpha: f64,
    length: f64,
    a: f64,
    b: f64,
    c: f64,
    pole: Point2<f64>,
    figure_error: Option<HeightProfile>,
    roughness: Option<Roughness>,
}
impl EllipticalMirror {
    /// Creates a new [`EllipticalMirror`].
    ///
    /// - `f1`: distance entrance focus - mirror center
    /// - `f2`: distance mirror center - exit focus
    /// - `alpha`: grazing incidence angle at the mirror center
    /// - `length`: mirror length
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `f1` or `f2` are not positive and finite.
    ///   - `alpha` is not within the open interval (0°, 90°).
    ///   - `length` is not positive or not shorter than both focal distances.
    pub fn new(f1: Length, f2: Length, alpha: Angle, length: Length) -> WiseResult<Self> {
        let f1 = f1.get::<meter>();
        let f2 = f2.get::<meter>();
        let alpha = alpha.get::<radian>();
        let length = length.get::<meter>();
        if !f1.is_normal() || f1.is_sign_negative() || !f2.is_normal() || f2.is_sign_negative() {
            return Err(WiseError::Configuration(
                "focal distances must be > 0.0 and finite".into(),
            ));
        }
        if !alpha.is_finite() || alpha <= 0.0 || alpha >= FRAC_PI_2 {
            return Err(WiseError::Configuration(
                "grazing angle must be within the range ]0.0; 90.0[ degrees".into(),
            ));
        }
        if !length.is_normal() || length.is_sign_negative() || length >= f1.min(f2) {
            return Err(WiseError::Configuration(
                "mirror length must be > 0.0 and shorter than both focal distances".into(),
            ));
        }
        let a = 0.5 * (f1 + f2);
        let c = 0.5
            * (2.0 * f1 * f2)
                .mul_add((2.0 * alpha).cos(), f1.mul_add(f1, f2 * f2))
                .sqrt();
        let b = (f1 * f2).sqrt() * alpha.sin();
        let pole = Point2::new(
            f1.mul_add(f1, -f2 * f2) / (4.0 * c),
            -f1 * f2 * (2.0 * alpha).sin() / (2.0 * c),
        );
        let mirror = Self {
            f1,
            f2,
            alpha,
            length,
            a,
            b,
            c,
            pole,
            figure_error: None,
            roughness: None,
        };
        let (x_start, x_end) = mirror.abscissa_range();
        if x_start <= -a || x_end >= a {
            return Err(WiseError::Configuration(
                "mirror does not fit on the ellipse branch".into(),
            ));
        }
        Ok(mirror)
    }
    /// Attach a figure error profile. The first sample of the profile is located at the mirror start.
    #[must_use]
    pub fn with_figure_error(mut self, figure_error: HeightProfile) -> Self {
        self.figure_error = Some(figure_error);
        self
    }
    /// Attach a roughness model.
    #[must_use]
    pub fn with_roughness(mut self, roughness: Roughness) -> Self {
        self.roughness = Some(roughness);
        self
    }
    /// Returns a reference to the figure error of this [`EllipticalMirror`].
    #[must_use]
    pub const fn figure_error(&self) -> Option<&HeightProfile> {
        self.figure_error.as_ref()
    }
    /// Returns a reference to the roughness of this [`EllipticalMirror`].
    #[must_use]
    pub const fn roughness(&self) -> Option<&Roughness> {
        self.roughness.as_ref()
    }
    /// Returns the entrance focal distance of this [`EllipticalMirror`].
    #[must_use]
    pub fn f1(&self) -> Length {
        Length::new::<meter>(self.f1)
    }
    /// Returns the exit focal distance of this [`EllipticalMirror`].
    #[must_use]
    pub fn f2(&self) -> Length {
        Length::new::<meter>(self.f2)
    }
    /// Returns the grazing incidence angle of this [`EllipticalMirror`].
    #[must_use]
    pub fn grazing_angle(&self) -> Angle {
        Angle::new::<radian>(self.alpha)
    }
    /// Returns the length of this [`EllipticalMirror`].
    #[must_use]
    pub fn length(&self) -> Length {
        Length::new::<meter>(self.length)
    }
    /// Returns the semi major axis of the ellipse.
    #[must_use]
    pub fn semi_major_axis(&self) -> Length {
        Length::new::<meter>(self.a)
    }
    /// Returns the semi minor axis of the ellipse.
    #[must_use]
    pub fn semi_minor_axis(&self) -> Length {
        Length::new::<meter>(self.b)
    }
    /// Returns the linear eccentricity (half the focal separation) of the ellipse.
    #[must_use]
    pub fn linear_eccentricity(&self) -> Length {
        Length::new::<meter>(self.c)
    }
    /// Returns the (numerical) eccentricity of the ellipse.
    #[must_use]
    pub fn eccentricity(&self) -> f64 {
        self.c / self.a
    }
    /// Entrance focus in lab coordinates.
    #[must_use]
    pub fn focus1(&self) -> Point2<f64> {
        Point2::new(-self.c, 0.0)
    }
    /// Exit focus in lab coordinates.
    #[must_use]
    pub fn focus2(&self) -> Point2<f64> {
        Point2::new(self.c, 0.0)
    }
    /// Mirror center in lab coordinates.
    #[must_use]
    pub const fn pole(&self) -> Point2<f64> {
        self.pole
    }
    /// Nominal surface height (lower ellipse branch) at abscissa `x`.
    #[must_use]
    pub fn surface_y(&self, x: f64) -> f64 {
        -self.b * (1.0 - (x / self.a).powi(2)).max(0.0).sqrt()
    }
    /// Implicit ellipse function `(x/a)² + (y/b)² - 1`. Zero on the nominal surface, negative inside.
    #[must_use]
    pub fn ellipse_residual(&self, x: f64, y: f64) -> f64 {
        (x / self.a).powi(2) + (y / self.b).powi(2) - 1.0
    }
    /// Unit surface tangent (pointing from the mirror start towards the mirror end) at a point of the ellipse.
    #[must_use]
    pub fn tangent_at(&self, x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(-y / (self.b * self.b), x / (self.a * self.a)).normalize()
    }
    /// Unit outward surface normal at a point of the ellipse.
    #[must_use]
    pub fn normal_at(&self, x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(x / (self.a * self.a), y / (self.b * self.b)).normalize()
    }
    /// Slope angle of the mirror tangent at the pole.
    #[must_use]
    pub fn pole_tangent_angle(&self) -> Angle {
        let t = self.tangent_at(self.pole.x, self.pole.y);
        Angle::new::<radian>(t.y.atan2(t.x))
    }
    /// Unit vector of the chief ray from `F1` to the pole.
    #[must_use]
    pub fn incidence_direction(&self) -> Vector2<f64> {
        (self.pole - self.focus1()).normalize()
    }
    /// Unit vector of the chief ray from the pole to `F2`.
    #[must_use]
    pub fn exit_direction(&self) -> Vector2<f64> {
        (self.focus2() - self.pole).normalize()
    }
    /// Direction angle of the incident chief ray.
    #[must_use]
    pub fn theta_incident(&self) -> Angle {
        let d = self.incidence_direction();
        Angle::new::<radian>(d.y.atan2(d.x))
    }
    /// Direction angle of the reflected chief ray.
    #[must_use]
    pub fn theta_exit(&self) -> Angle {
        let d = self.exit_direction();
        Angle::new::<radian>(d.y.atan2(d.x))
    }
    /// Abscissas of the mirror ends (mirror start first).
    fn abscissa_range(&self) -> (f64, f64) {
        let half = 0.5 * self.length * self.tangent_at(self.pole.x, self.pole.y).x;
        (self.pole.x - half, self.pole.x + half)
    }
    /// Sample the nominal mirror surface with `n` points.
    ///
    /// The mirror extends by `length/2` along the pole tangent on both sides of the pole. A single point is
    /// located at the pole.
    ///
    /// # Errors
    ///
    /// This function will return an error if `n` is zero.
    pub fn surface_points(
        &self,
        n: usize,
        spacing: SurfaceSpacing,
    ) -> WiseResult<(Vec<f64>, Vec<f64>)> {
        if n == 0 {
            return Err(WiseError::Configuration(
                "number of surface points must be > 0".into(),
            ));
        }
        if n == 1 {
            return Ok((vec![self.pole.x], vec![self.pole.y]));
        }
        let (x_start, x_end) = self.abscissa_range();
        let x = match spacing {
            SurfaceSpacing::UniformAbscissa => linspace(x_start, x_end, n),
            SurfaceSpacing::UniformArcLength => {
                let x_dense = linspace(x_start, x_end, (16 * n).max(2048));
                let y_dense: Vec<f64> = x_dense.iter().map(|x| self.surface_y(*x)).collect();
                let s_dense = arc_length(&x_dense, &y_dense);
                let s_total = s_dense[s_dense.len() - 1];
                linspace(0.0, s_total, n)
                    .iter()
                    .map(|s| interp_linear(&s_dense, &x_dense, *s))
                    .collect()
            }
        };
        let y = x.iter().map(|x| self.surface_y(*x)).collect();
        Ok((x, y))
    }
    /// Sample the real mirror surface (nominal surface plus figure error and roughness realization).
    ///
    /// Heights are evaluated at the arc length position of each nominal sample, measured from the mirror start.
    ///
    /// # Errors
    ///
    /// This function will return an error if `n` is zero.
    pub fn sample_surface(&self, n: usize, spacing: SurfaceSpacing) -> WiseResult<MirrorSurface> {
        let (x, y) = self.surface_points(n, spacing)?;
        let mut residuals = vec![0.0; x.len()];
        let s = arc_length(&x, &y);
        let s_end = s.last().copied().unwrap_or_default();
        let profiles = self
            .figure_error
            .iter()
            .chain(self.roughness.as_ref().and_then(Roughness::realization));
        let mut perturbed = false;
        for profile in profiles {
            if profile.extent().get::<meter>() < s_end {
                warn!("height profile shorter than the mirror, holding its last sample");
            }
            for (r, h) in residuals.iter_mut().zip(profile.heights_at(&s)) {
                *r += h;
            }
            perturbed = true;
        }
        if !perturbed {
            return Ok(MirrorSurface { x, y, residuals });
        }
        let (x, y) = izip!(&x, &y, &residuals)
            .map(|(x, y, h)| {
                let p = Point2::new(*x, *y) - *h * self.normal_at(*x, *y);
                (p.x, p.y)
            })
            .unzip();
        Ok(MirrorSurface { x, y, residuals })
    }
    /// Sample the detector plane with `n` points.
    ///
    /// The detector is a line of width `detector_size` perpendicular to the exit chief ray. Its center is the exit
    /// focus shifted by `defocus` along the exit chief ray (positive values move away from the mirror).
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `detector_size` is not positive and finite.
    ///   - `n` is zero.
    ///   - `defocus` is not finite or moves the detector onto or behind the mirror.
    pub fn detector_plane_points(
        &self,
        detector_size: Length,
        n: usize,
        defocus: Length,
    ) -> WiseResult<(Vec<f64>, Vec<f64>)> {
        let size = detector_size.get::<meter>();
        let defocus = defocus.get::<meter>();
        if !size.is_normal() || size.is_sign_negative() {
            return Err(WiseError::Configuration(
                "detector size must be > 0.0 and finite".into(),
            ));
        }
        if n == 0 {
            return Err(WiseError::Configuration(
                "number of detector points must be > 0".into(),
            ));
        }
        if !defocus.is_finite() {
            return Err(WiseError::Configuration("defocus must be finite".into()));
        }
        if self.f2 + defocus <= 0.0 {
            return Err(WiseError::Configuration(
                "Defocus sweep reached the previous mirror".into(),
            ));
        }
        let u = self.exit_direction();
        let center = self.focus2() + defocus * u;
        let transverse = Vector2::new(-u.y, u.x);
        let offsets = if n == 1 {
            vec![0.0]
        } else {
            linspace(-0.5 * size, 0.5 * size, n)
        };
        Ok(offsets
            .iter()
            .map(|t| {
                let p = center + *t * transverse;
                (p.x, p.y)
            })
            .unzip())
    }
}

/// Cumulative chord length along a polyline, starting with 0.0 at the first point.
#[must_use]
pub fn arc_length(x: &[f64], y: &[f64]) -> Vec<f64> {
    let mut s = Vec::with_capacity(x.len());
    let mut total = 0.0;
    for i in 0..x.len().min(y.len()) {
        if i > 0 {
            total += (x[i] - x[i - 1]).hypot(y[i] - y[i - 1]);
        }
        s.push(total);
    }
    s
}
