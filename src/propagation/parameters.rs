#![warn(missing_docs)]
//! Parameters of a single propagation request.
use super::wavefront::Wavefront;
use crate::{
    error::{WiseError, WiseResult},
    mirror::EllipticalMirror,
    sources::FieldSource,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum::EnumIter;
use uom::si::{f64::Length, length::meter};

/// How the number of integration points is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// the number of points is computed from the geometry
    #[default]
    Automatic,
    /// the number of points is given explicitly
    UserDefined,
}
impl Display for CalculationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::Automatic => "automatic",
            Self::UserDefined => "user defined",
        };
        write!(f, "{msg}")
    }
}

/// Sampling parameters of the diffraction integral.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalIntegrationParameters {
    calculation_type: CalculationType,
    detector_size: Length,
    number_of_points: Option<usize>,
    calculated_number_of_points: Option<usize>,
}
impl NumericalIntegrationParameters {
    /// Parameters with an automatically computed number of points.
    ///
    /// # Errors
    ///
    /// This function will return an error if `detector_size` is not positive and finite.
    pub fn automatic(detector_size: Length) -> WiseResult<Self> {
        Self::check_detector_size(detector_size)?;
        Ok(Self {
            calculation_type: CalculationType::Automatic,
            detector_size,
            number_of_points: None,
            calculated_number_of_points: None,
        })
    }
    /// Parameters with an explicitly given number of points.
    ///
    /// # Errors
    ///
    /// This function will return an error if `detector_size` is not positive and finite or `number_of_points`
    /// is zero.
    pub fn user_defined(detector_size: Length, number_of_points: usize) -> WiseResult<Self> {
        Self::check_detector_size(detector_size)?;
        if number_of_points == 0 {
            return Err(WiseError::Configuration(
                "number of points must be > 0".into(),
            ));
        }
        Ok(Self {
            calculation_type: CalculationType::UserDefined,
            detector_size,
            number_of_points: Some(number_of_points),
            calculated_number_of_points: None,
        })
    }
    fn check_detector_size(detector_size: Length) -> WiseResult<()> {
        let size = detector_size.get::<meter>();
        if !size.is_normal() || size.is_sign_negative() {
            return Err(WiseError::Configuration(
                "detector size must be > 0.0 and finite".into(),
            ));
        }
        Ok(())
    }
    /// Returns the calculation type of these parameters.
    #[must_use]
    pub const fn calculation_type(&self) -> CalculationType {
        self.calculation_type
    }
    /// Returns the detector size.
    #[must_use]
    pub const fn detector_size(&self) -> Length {
        self.detector_size
    }
    /// Returns the explicitly requested number of points (only for [`CalculationType::UserDefined`]).
    #[must_use]
    pub const fn number_of_points(&self) -> Option<usize> {
        self.number_of_points
    }
    /// Returns the number of points used by the last computation with these parameters.
    #[must_use]
    pub const fn calculated_number_of_points(&self) -> Option<usize> {
        self.calculated_number_of_points
    }
    /// Record the number of points used by a computation.
    pub fn set_calculated_number_of_points(&mut self, number_of_points: usize) {
        self.calculated_number_of_points = Some(number_of_points);
    }
    /// Returns `true` if a mirror field computed with `previous` can be reused for these parameters.
    ///
    /// This is the case if `previous` has been used for a computation, the calculation type is the same and
    /// either the detector size ([`CalculationType::Automatic`]) or the number of points
    /// ([`CalculationType::UserDefined`]) is unchanged.
    #[must_use]
    pub fn is_reusable_from(&self, previous: &Self) -> bool {
        if previous.calculated_number_of_points.is_none()
            || self.calculation_type != previous.calculation_type
        {
            return false;
        }
        match self.calculation_type {
            CalculationType::Automatic => self.detector_size == previous.detector_size,
            CalculationType::UserDefined => self.number_of_points == previous.number_of_points,
        }
    }
}

/// Stages computed by a propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter)]
pub enum PropagationType {
    /// sample the mirror and evaluate the source field on it
    MirrorOnly,
    /// reuse the mirror field of a previous wavefront and compute the detector field
    DetectorOnly,
    /// compute the mirror and the detector field
    #[default]
    MirrorAndDetector,
}
impl PropagationType {
    /// Choose the propagation type for `requested` parameters given the parameters of a previous computation.
    ///
    /// If the previous mirror field is reusable, [`PropagationType::DetectorOnly`] is returned and the previously
    /// calculated number of points is carried over to `requested`.
    pub fn select(
        requested: &mut NumericalIntegrationParameters,
        previous: Option<&NumericalIntegrationParameters>,
    ) -> Self {
        match previous {
            Some(previous) if requested.is_reusable_from(previous) => {
                requested.calculated_number_of_points = previous.calculated_number_of_points;
                Self::DetectorOnly
            }
            _ => Self::MirrorAndDetector,
        }
    }
}
impl Display for PropagationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::MirrorOnly => "mirror only",
            Self::DetectorOnly => "detector only",
            Self::MirrorAndDetector => "mirror and detector",
        };
        write!(f, "{msg}")
    }
}

/// A propagation request.
///
/// This is a transient value built for every propagation call. It only borrows the source, the mirror and a
/// previous wavefront.
#[derive(Debug, Clone)]
pub struct PropagationParameters<'a> {
    propagation_type: PropagationType,
    source: Option<&'a dyn FieldSource>,
    optical_element: Option<&'a EllipticalMirror>,
    wavefront: Option<&'a Wavefront>,
    numerical_integration: NumericalIntegrationParameters,
    defocus: Length,
    workers: usize,
}
impl<'a> PropagationParameters<'a> {
    /// Creates a new [`PropagationParameters`] without source, optical element and wavefront.
    #[must_use]
    pub fn new(
        propagation_type: PropagationType,
        numerical_integration: NumericalIntegrationParameters,
    ) -> Self {
        Self {
            propagation_type,
            source: None,
            optical_element: None,
            wavefront: None,
            numerical_integration,
            defocus: Length::new::<meter>(0.0),
            workers: 0,
        }
    }
    /// Set the source.
    #[must_use]
    pub fn with_source(mut self, source: &'a dyn FieldSource) -> Self {
        self.source = Some(source);
        self
    }
    /// Set the optical element.
    #[must_use]
    pub fn with_optical_element(mut self, mirror: &'a EllipticalMirror) -> Self {
        self.optical_element = Some(mirror);
        self
    }
    /// Set the previously computed wavefront.
    #[must_use]
    pub fn with_wavefront(mut self, wavefront: &'a Wavefront) -> Self {
        self.wavefront = Some(wavefront);
        self
    }
    /// Set the detector defocus.
    #[must_use]
    pub fn with_defocus(mut self, defocus: Length) -> Self {
        self.defocus = defocus;
        self
    }
    /// Set the number of worker threads (0 or 1: single threaded).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
    /// Set the propagation type.
    #[must_use]
    pub fn with_propagation_type(mut self, propagation_type: PropagationType) -> Self {
        self.propagation_type = propagation_type;
        self
    }
    /// Replace the numerical integration parameters.
    #[must_use]
    pub fn with_numerical_integration(
        mut self,
        numerical_integration: NumericalIntegrationParameters,
    ) -> Self {
        self.numerical_integration = numerical_integration;
        self
    }
    /// Returns the propagation type.
    #[must_use]
    pub const fn propagation_type(&self) -> PropagationType {
        self.propagation_type
    }
    /// Returns the source.
    ///
    /// # Errors
    ///
    /// This function will return an error if no source was set.
    pub fn source(&self) -> WiseResult<&'a dyn FieldSource> {
        self.source
            .ok_or_else(|| WiseError::MissingInput("no source given".into()))
    }
    /// Returns the optical element.
    ///
    /// # Errors
    ///
    /// This function will return an error if no optical element was set.
    pub fn optical_element(&self) -> WiseResult<&'a EllipticalMirror> {
        self.optical_element
            .ok_or_else(|| WiseError::MissingInput("no optical element given".into()))
    }
    /// Returns the previously computed wavefront, if any.
    #[must_use]
    pub const fn wavefront(&self) -> Option<&'a Wavefront> {
        self.wavefront
    }
    /// Returns the numerical integration parameters.
    #[must_use]
    pub const fn numerical_integration(&self) -> &NumericalIntegrationParameters {
        &self.numerical_integration
    }
    /// Returns the detector defocus.
    #[must_use]
    pub const fn defocus(&self) -> Length {
        self.defocus
    }
    /// Returns the number of worker threads.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, micrometer, millimeter, nanometer, radian, sources::GaussianSource};
    use assert_matches::assert_matches;

    #[test]
    fn calculation_type_display() {
        assert_eq!(format!("{}", CalculationType::Automatic), "automatic");
        assert_eq!(format!("{}", CalculationType::UserDefined), "user defined");
        assert_eq!(CalculationType::default(), CalculationType::Automatic);
    }
    #[test]
    fn propagation_type_display() {
        assert_eq!(format!("{}", PropagationType::MirrorOnly), "mirror only");
        assert_eq!(format!("{}", PropagationType::DetectorOnly), "detector only");
        assert_eq!(
            format!("{}", PropagationType::MirrorAndDetector),
            "mirror and detector"
        );
    }
    #[test]
    fn automatic() {
        let p = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
        assert_eq!(p.calculation_type(), CalculationType::Automatic);
        assert_eq!(p.detector_size(), micrometer!(20.0));
        assert!(p.number_of_points().is_none());
        assert!(p.calculated_number_of_points().is_none());
        assert!(NumericalIntegrationParameters::automatic(meter!(0.0)).is_err());
        assert!(NumericalIntegrationParameters::automatic(meter!(f64::NAN)).is_err());
    }
    #[test]
    fn user_defined() {
        let p = NumericalIntegrationParameters::user_defined(micrometer!(20.0), 400).unwrap();
        assert_eq!(p.calculation_type(), CalculationType::UserDefined);
        assert_eq!(p.number_of_points(), Some(400));
        assert!(NumericalIntegrationParameters::user_defined(micrometer!(20.0), 0).is_err());
        assert!(NumericalIntegrationParameters::user_defined(meter!(-1.0), 10).is_err());
    }
    #[test]
    fn reusable_automatic() {
        let mut previous = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
        let same = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
        assert!(!same.is_reusable_from(&previous));
        previous.set_calculated_number_of_points(160);
        assert!(same.is_reusable_from(&previous));
        let other_size = NumericalIntegrationParameters::automatic(micrometer!(30.0)).unwrap();
        assert!(!other_size.is_reusable_from(&previous));
        let other_type = NumericalIntegrationParameters::user_defined(micrometer!(20.0), 160).unwrap();
        assert!(!other_type.is_reusable_from(&previous));
    }
    #[test]
    fn reusable_user_defined() {
        let mut previous =
            NumericalIntegrationParameters::user_defined(micrometer!(20.0), 400).unwrap();
        previous.set_calculated_number_of_points(400);
        let other_size =
            NumericalIntegrationParameters::user_defined(micrometer!(50.0), 400).unwrap();
        assert!(other_size.is_reusable_from(&previous));
        let other_points =
            NumericalIntegrationParameters::user_defined(micrometer!(20.0), 401).unwrap();
        assert!(!other_points.is_reusable_from(&previous));
    }
    #[test]
    fn select() {
        let mut previous = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
        previous.set_calculated_number_of_points(123);
        let mut requested = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
        assert_eq!(
            PropagationType::select(&mut requested, Some(&previous)),
            PropagationType::DetectorOnly
        );
        assert_eq!(requested.calculated_number_of_points(), Some(123));
        let mut requested = NumericalIntegrationParameters::automatic(micrometer!(10.0)).unwrap();
        assert_eq!(
            PropagationType::select(&mut requested, Some(&previous)),
            PropagationType::MirrorAndDetector
        );
        assert!(requested.calculated_number_of_points().is_none());
        assert_eq!(
            PropagationType::select(&mut requested, None),
            PropagationType::MirrorAndDetector
        );
    }
    #[test]
    fn parameters() {
        let nip = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
        let p = PropagationParameters::new(PropagationType::MirrorOnly, nip.clone());
        assert_eq!(p.propagation_type(), PropagationType::MirrorOnly);
        assert_matches!(p.source(), Err(WiseError::MissingInput(_)));
        assert_matches!(p.optical_element(), Err(WiseError::MissingInput(_)));
        assert!(p.wavefront().is_none());
        assert_eq!(p.defocus(), meter!(0.0));
        assert_eq!(p.workers(), 0);
        assert_eq!(p.numerical_integration(), &nip);
        let source =
            GaussianSource::new(nanometer!(1.0), micrometer!(20.0), meter!(0.0, 0.0), radian!(0.0))
                .unwrap();
        let mirror =
            EllipticalMirror::new(meter!(20.0), meter!(1.0), radian!(0.01), meter!(0.2)).unwrap();
        let p = p
            .with_source(&source)
            .with_optical_element(&mirror)
            .with_defocus(millimeter!(2.0))
            .with_workers(4)
            .with_propagation_type(PropagationType::DetectorOnly);
        assert!(p.source().is_ok());
        assert!(p.optical_element().is_ok());
        assert_eq!(p.defocus(), millimeter!(2.0));
        assert_eq!(p.workers(), 4);
        assert_eq!(p.propagation_type(), PropagationType::DetectorOnly);
    }
}
