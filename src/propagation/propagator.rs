#![warn(missing_docs)]
//! Propagators and the propagator registry.
//!
//! A [`Propagator`] turns a [`PropagationParameters`] request into a [`Wavefront`]. Propagators are stateless per
//! call and trust the requested [`PropagationType`]. The [`PropagatorRegistry`] dispatches a request to the
//! propagator handling a given [`PropagationAlgorithm`].
use super::{
    hew::half_energy_width_at,
    huygens::huygens_integral,
    parameters::{CalculationType, NumericalIntegrationParameters, PropagationParameters, PropagationType},
    sampling::{FresnelSampling, SamplingStrategy},
    wavefront::{DetectorField, MirrorField, Wavefront},
};
use crate::{
    error::{WiseError, WiseResult},
    mirror::{arc_length, EllipticalMirror, SurfaceSpacing},
    sources::FieldSource,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fmt::Display, sync::OnceLock};
use strum::EnumIter;
use uom::si::{f64::Length, length::meter};

/// Diffraction algorithm used by a propagation.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum PropagationAlgorithm {
    /// 1-D Huygens-Fresnel integral from the mirror surface to the detector line
    #[default]
    HuygensIntegral,
}
impl Display for PropagationAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::HuygensIntegral => "Huygens integral",
        };
        write!(f, "{msg}")
    }
}

/// A propagation algorithm implementation.
pub trait Propagator: Debug + Send + Sync {
    /// Returns the algorithm implemented by this propagator.
    fn algorithm(&self) -> PropagationAlgorithm;
    /// Returns `true` if this propagator handles requests for `algorithm`.
    fn is_handler(&self, algorithm: PropagationAlgorithm) -> bool {
        self.algorithm() == algorithm
    }
    /// Perform a propagation.
    ///
    /// # Errors
    ///
    /// This function will return an error if a required input is missing or the parameters are inconsistent.
    fn propagate(&self, parameters: &PropagationParameters) -> WiseResult<Wavefront>;
}

/// Huygens-Fresnel propagation from an elliptical mirror to a detector line.
#[derive(Debug)]
pub struct HuygensIntegralPropagator {
    sampling: Box<dyn SamplingStrategy>,
    spacing: SurfaceSpacing,
}
impl Default for HuygensIntegralPropagator {
    fn default() -> Self {
        Self {
            sampling: Box::new(FresnelSampling::default()),
            spacing: SurfaceSpacing::default(),
        }
    }
}
impl HuygensIntegralPropagator {
    /// Creates a new [`HuygensIntegralPropagator`] with the given sampling strategy and mirror point spacing.
    #[must_use]
    pub fn new(sampling: Box<dyn SamplingStrategy>, spacing: SurfaceSpacing) -> Self {
        Self { sampling, spacing }
    }
    fn number_of_points(
        &self,
        wavelength: Length,
        mirror: &EllipticalMirror,
        nip: &NumericalIntegrationParameters,
    ) -> WiseResult<usize> {
        match nip.calculation_type() {
            CalculationType::UserDefined => nip.number_of_points().ok_or_else(|| {
                WiseError::Configuration("number of points missing for user defined sampling".into())
            }),
            CalculationType::Automatic => self.sampling.sample_count(
                wavelength,
                mirror.f2(),
                mirror.length(),
                nip.detector_size(),
                mirror.theta_incident(),
                mirror.theta_exit(),
            ),
        }
    }
    fn mirror_field(
        &self,
        source: &dyn FieldSource,
        mirror: &EllipticalMirror,
        number_of_points: usize,
        workers: usize,
    ) -> WiseResult<MirrorField> {
        let surface = mirror.sample_surface(number_of_points, self.spacing)?;
        let s = arc_length(&surface.x, &surface.y);
        let field = source.evaluate_field(&surface.x, &surface.y, workers)?;
        Ok(MirrorField {
            x: surface.x,
            y: surface.y,
            s,
            field,
            residuals: surface.residuals,
        })
    }
    fn detector_field(
        wavelength: Length,
        mirror_field: &MirrorField,
        mirror: &EllipticalMirror,
        parameters: &PropagationParameters,
        number_of_points: usize,
    ) -> WiseResult<DetectorField> {
        let (x, y) = mirror.detector_plane_points(
            parameters.numerical_integration().detector_size(),
            number_of_points,
            parameters.defocus(),
        )?;
        let field = huygens_integral(
            wavelength.get::<meter>(),
            &mirror_field.field,
            &mirror_field.x,
            &mirror_field.y,
            &x,
            &y,
            parameters.workers(),
        )?;
        let s = arc_length(&x, &y);
        let intensity: Vec<f64> = field.iter().map(|e| e.norm_sqr()).collect();
        let hew = half_energy_width_at(&intensity, &s)?;
        Ok(DetectorField {
            x,
            y,
            s,
            field,
            hew,
        })
    }
}
impl Propagator for HuygensIntegralPropagator {
    fn algorithm(&self) -> PropagationAlgorithm {
        PropagationAlgorithm::HuygensIntegral
    }
    fn propagate(&self, parameters: &PropagationParameters) -> WiseResult<Wavefront> {
        let mirror = parameters.optical_element()?;
        let propagation_type = parameters.propagation_type();
        let wavefront = match propagation_type {
            PropagationType::MirrorOnly | PropagationType::MirrorAndDetector => {
                let source = parameters.source()?;
                let wavelength = source.wavelength();
                let n = self.number_of_points(wavelength, mirror, parameters.numerical_integration())?;
                let mirror_field = self.mirror_field(source, mirror, n, parameters.workers())?;
                let detector_field = if propagation_type == PropagationType::MirrorAndDetector {
                    Some(Self::detector_field(
                        wavelength,
                        &mirror_field,
                        mirror,
                        parameters,
                        n,
                    )?)
                } else {
                    None
                };
                Wavefront::new(wavelength, n, Some(mirror_field), detector_field)
            }
            PropagationType::DetectorOnly => {
                let previous = parameters.wavefront().ok_or_else(|| {
                    WiseError::MissingInput("detector only propagation needs a previous wavefront".into())
                })?;
                let mirror_field = previous.mirror().ok_or_else(|| {
                    WiseError::MissingInput("previous wavefront has no mirror field".into())
                })?;
                let n = previous.number_of_points();
                let detector_field = Self::detector_field(
                    previous.wavelength(),
                    mirror_field,
                    mirror,
                    parameters,
                    n,
                )?;
                Wavefront::new(previous.wavelength(), n, None, Some(detector_field))
            }
        };
        match wavefront.hew() {
            Some(hew) => info!(
                "{propagation_type} propagation: {} points, HEW {} m",
                wavefront.number_of_points(),
                hew.get::<meter>()
            ),
            None => info!(
                "{propagation_type} propagation: {} points",
                wavefront.number_of_points()
            ),
        }
        Ok(wavefront)
    }
}

/// Registry of the available propagators.
#[derive(Debug)]
pub struct PropagatorRegistry {
    propagators: Vec<Box<dyn Propagator>>,
}
impl Default for PropagatorRegistry {
    /// Registry containing the [`HuygensIntegralPropagator`].
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(HuygensIntegralPropagator::default()));
        registry
    }
}
impl PropagatorRegistry {
    /// Creates an empty [`PropagatorRegistry`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            propagators: Vec::new(),
        }
    }
    /// Add a propagator. Earlier registered propagators take precedence for the same algorithm.
    pub fn register(&mut self, propagator: Box<dyn Propagator>) {
        self.propagators.push(propagator);
    }
    /// Returns the process wide default registry.
    ///
    /// The registry is built on first access, exactly once, even if several threads access it concurrently.
    #[must_use]
    pub fn shared() -> &'static Self {
        static REGISTRY: OnceLock<PropagatorRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::default)
    }
    /// Dispatch a propagation request to the propagator handling `algorithm`.
    ///
    /// # Errors
    ///
    /// This function will return an error if no propagator for `algorithm` is registered or the propagation fails.
    pub fn propagate(
        &self,
        parameters: &PropagationParameters,
        algorithm: PropagationAlgorithm,
    ) -> WiseResult<Wavefront> {
        self.propagators
            .iter()
            .find(|p| p.is_handler(algorithm))
            .ok_or_else(|| {
                WiseError::UnsupportedConfiguration(format!(
                    "no propagator registered for algorithm {algorithm}"
                ))
            })?
            .propagate(parameters)
    }
}
