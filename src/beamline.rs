#![warn(missing_docs)]
//! Beamline stages.
//!
//! A [`SourceStage`] holds a source and how it is placed in front of the following mirror. A [`MirrorStage`]
//! holds an elliptical mirror together with the result of its last propagation and the numerical integration
//! parameters used for it. Repeated propagations of a mirror stage only recompute the detector field if the
//! mirror field can be reused.
use crate::{
    error::{WiseError, WiseResult},
    mirror::EllipticalMirror,
    propagation::{
        NumericalIntegrationParameters, PropagationAlgorithm, PropagationParameters,
        PropagationType, PropagatorRegistry, Wavefront,
    },
    sources::{FieldSource, FocusCorrection, Source, TabulatedSource},
};
use log::info;
use uom::si::{f64::Length, length::meter};

/// Placement of a source with respect to the following mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SourcePlacement {
    /// keep the origin and direction of the source
    #[default]
    UserDefined,
    /// place the source at the entrance focus of the mirror, pointing at the mirror center
    AtMirrorFocus(FocusCorrection),
}

/// A source at the beginning of a beamline.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStage {
    source: Source,
    placement: SourcePlacement,
}
impl SourceStage {
    /// Creates a new [`SourceStage`].
    pub fn new(source: impl Into<Source>, placement: SourcePlacement) -> Self {
        Self {
            source: source.into(),
            placement,
        }
    }
    /// Creates a [`SourceStage`] from the detector field of a previous propagation.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront does not contain a usable detector field.
    pub fn from_wavefront(wavefront: &Wavefront, placement: SourcePlacement) -> WiseResult<Self> {
        Ok(Self::new(TabulatedSource::from_wavefront(wavefront)?, placement))
    }
    /// Returns the (unplaced) source of this stage.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }
    /// Returns the placement of this stage.
    #[must_use]
    pub const fn placement(&self) -> &SourcePlacement {
        &self.placement
    }
    /// Returns the source as seen by `mirror`.
    ///
    /// For [`SourcePlacement::AtMirrorFocus`] the returned copy is placed at the entrance focus of `mirror`. The
    /// source of this stage itself is not modified.
    #[must_use]
    pub fn placed_for(&self, mirror: &EllipticalMirror) -> Source {
        let mut source = self.source.clone();
        if let SourcePlacement::AtMirrorFocus(correction) = &self.placement {
            source.locate_at_mirror_focus(mirror, correction);
        }
        source
    }
}

/// Input of a [`MirrorStage`].
#[derive(Debug, Clone, Copy)]
pub enum StageInput<'a> {
    /// a source stage
    Source(&'a SourceStage),
    /// the output of a previous mirror
    Mirror(&'a MirrorStage),
}

/// An elliptical mirror stage with its last propagation result.
#[derive(Debug, Clone)]
pub struct MirrorStage {
    mirror: EllipticalMirror,
    defocus: Length,
    algorithm: PropagationAlgorithm,
    source: Option<Source>,
    numerical_integration: Option<NumericalIntegrationParameters>,
    wavefront: Option<Wavefront>,
    last_propagation_type: Option<PropagationType>,
}
impl MirrorStage {
    /// Creates a new [`MirrorStage`] with zero detector defocus.
    #[must_use]
    pub fn new(mirror: EllipticalMirror) -> Self {
        Self {
            mirror,
            defocus: Length::new::<meter>(0.0),
            algorithm: PropagationAlgorithm::default(),
            source: None,
            numerical_integration: None,
            wavefront: None,
            last_propagation_type: None,
        }
    }
    /// Set the detector defocus.
    #[must_use]
    pub fn with_defocus(mut self, defocus: Length) -> Self {
        self.defocus = defocus;
        self
    }
    /// Set the detector defocus of the following propagations.
    pub fn set_defocus(&mut self, defocus: Length) {
        self.defocus = defocus;
    }
    /// Returns the mirror of this stage.
    #[must_use]
    pub const fn mirror(&self) -> &EllipticalMirror {
        &self.mirror
    }
    /// Returns the detector defocus.
    #[must_use]
    pub const fn defocus(&self) -> Length {
        self.defocus
    }
    /// Returns the (placed) source used by the last propagation.
    #[must_use]
    pub const fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }
    /// Returns the numerical integration parameters of the last propagation.
    #[must_use]
    pub const fn numerical_integration(&self) -> Option<&NumericalIntegrationParameters> {
        self.numerical_integration.as_ref()
    }
    /// Returns the result of the last propagation.
    #[must_use]
    pub const fn wavefront(&self) -> Option<&Wavefront> {
        self.wavefront.as_ref()
    }
    /// Returns the propagation type of the last propagation.
    #[must_use]
    pub const fn last_propagation_type(&self) -> Option<PropagationType> {
        self.last_propagation_type
    }
    /// Parameters for a propagation of this stage with the given source.
    ///
    /// The returned parameters do not contain a wavefront. Use them e.g. as template of a best focus search.
    #[must_use]
    pub fn parameters<'a>(
        &'a self,
        source: &'a Source,
        numerical_integration: NumericalIntegrationParameters,
        workers: usize,
    ) -> PropagationParameters<'a> {
        PropagationParameters::new(PropagationType::MirrorAndDetector, numerical_integration)
            .with_source(source)
            .with_optical_element(&self.mirror)
            .with_defocus(self.defocus)
            .with_workers(workers)
    }
    /// Propagate the input through this stage.
    ///
    /// The mirror field of the previous propagation is reused (detector only propagation) if the placed source is
    /// unchanged and the numerical integration parameters allow it (see
    /// [`NumericalIntegrationParameters::is_reusable_from`]).
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the input is a previous mirror stage ([`WiseError::UnsupportedConfiguration`]).
    ///   - the propagation fails.
    pub fn propagate(
        &mut self,
        input: StageInput,
        mut numerical_integration: NumericalIntegrationParameters,
        workers: usize,
        registry: &PropagatorRegistry,
    ) -> WiseResult<&Wavefront> {
        let source = match input {
            StageInput::Source(stage) => stage.placed_for(&self.mirror),
            StageInput::Mirror(_) => {
                return Err(WiseError::UnsupportedConfiguration(
                    "propagation from a previous mirror is not supported, convert its wavefront into a source stage"
                        .into(),
                ))
            }
        };
        let previous = match (&self.source, &self.wavefront) {
            (Some(previous_source), Some(_)) if *previous_source == source => {
                self.numerical_integration.as_ref()
            }
            _ => None,
        };
        let propagation_type = PropagationType::select(&mut numerical_integration, previous);
        info!("propagating mirror stage ({propagation_type})");
        let mut params = self
            .parameters(&source, numerical_integration.clone(), workers)
            .with_propagation_type(propagation_type);
        if let Some(wavefront) = &self.wavefront {
            params = params.with_wavefront(wavefront);
        }
        let result = registry.propagate(&params, self.algorithm)?;
        let wavefront = match propagation_type {
            PropagationType::DetectorOnly => Wavefront::new(
                result.wavelength(),
                result.number_of_points(),
                self.wavefront.as_ref().and_then(Wavefront::mirror).cloned(),
                result.into_detector(),
            ),
            _ => result,
        };
        numerical_integration.set_calculated_number_of_points(wavefront.number_of_points());
        self.numerical_integration = Some(numerical_integration);
        self.source = Some(source);
        self.last_propagation_type = Some(propagation_type);
        Ok(&*self.wavefront.insert(wavefront))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        meter, micrometer, millimeter, nanometer, radian, sources::GaussianSource,
    };
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    fn mirror() -> EllipticalMirror {
        EllipticalMirror::new(meter!(20.0), meter!(1.0), radian!(0.01), meter!(0.2)).unwrap()
    }
    fn source_stage() -> SourceStage {
        let source =
            GaussianSource::new(nanometer!(1.0), micrometer!(20.0), meter!(0.0, 0.0), radian!(0.0))
                .unwrap();
        SourceStage::new(source, SourcePlacement::AtMirrorFocus(FocusCorrection::default()))
    }
    fn nip(points: usize) -> NumericalIntegrationParameters {
        NumericalIntegrationParameters::user_defined(micrometer!(20.0), points).unwrap()
    }
    #[test]
    fn placed_for() {
        let m = mirror();
        let stage = source_stage();
        let placed = stage.placed_for(&m);
        assert_abs_diff_eq!(placed.origin().x, m.focus1().x);
        assert_abs_diff_eq!(placed.origin().y, m.focus1().y);
        assert_eq!(stage.source().origin().x, 0.0);
        let user = SourceStage::new(stage.source().clone(), SourcePlacement::UserDefined);
        assert_eq!(&user.placed_for(&m), user.source());
        assert_eq!(user.placement(), &SourcePlacement::UserDefined);
    }
    #[test]
    fn reuse_mirror_field() {
        let registry = PropagatorRegistry::default();
        let input = source_stage();
        let mut stage = MirrorStage::new(mirror());
        assert!(stage.wavefront().is_none());
        let first = stage
            .propagate(StageInput::Source(&input), nip(200), 0, &registry)
            .unwrap()
            .clone();
        assert_eq!(
            stage.last_propagation_type(),
            Some(PropagationType::MirrorAndDetector)
        );
        assert_eq!(
            stage.numerical_integration().unwrap().calculated_number_of_points(),
            Some(200)
        );
        stage.set_defocus(millimeter!(2.0));
        let second = stage
            .propagate(StageInput::Source(&input), nip(200), 0, &registry)
            .unwrap()
            .clone();
        assert_eq!(
            stage.last_propagation_type(),
            Some(PropagationType::DetectorOnly)
        );
        assert_eq!(second.mirror(), first.mirror());
        assert_ne!(second.detector(), first.detector());
        assert!(second.hew().unwrap() > first.hew().unwrap());
        stage
            .propagate(StageInput::Source(&input), nip(150), 0, &registry)
            .unwrap();
        assert_eq!(
            stage.last_propagation_type(),
            Some(PropagationType::MirrorAndDetector)
        );
        assert_eq!(stage.wavefront().unwrap().number_of_points(), 150);
    }
    #[test]
    fn changed_source_recomputes_mirror() {
        let registry = PropagatorRegistry::default();
        let mut stage = MirrorStage::new(mirror());
        stage
            .propagate(StageInput::Source(&source_stage()), nip(100), 0, &registry)
            .unwrap();
        let shifted = SourceStage::new(
            source_stage().source().clone(),
            SourcePlacement::AtMirrorFocus(FocusCorrection {
                transverse: micrometer!(10.0),
                ..FocusCorrection::default()
            }),
        );
        stage
            .propagate(StageInput::Source(&shifted), nip(100), 0, &registry)
            .unwrap();
        assert_eq!(
            stage.last_propagation_type(),
            Some(PropagationType::MirrorAndDetector)
        );
    }
    #[test]
    fn chain_stages() {
        let registry = PropagatorRegistry::default();
        let mut first = MirrorStage::new(mirror());
        let wavefront = first
            .propagate(StageInput::Source(&source_stage()), nip(200), 0, &registry)
            .unwrap();
        let next = SourceStage::from_wavefront(wavefront, SourcePlacement::UserDefined).unwrap();
        assert_matches!(next.source(), Source::Tabulated(_));
        assert_eq!(next.source().wavelength(), nanometer!(1.0));
        let f2 = first.mirror().focus2();
        assert_abs_diff_eq!(next.source().origin().x, f2.x, epsilon = 1e-9);
        assert_abs_diff_eq!(next.source().origin().y, f2.y, epsilon = 1e-9);
        let mut second = MirrorStage::new(mirror());
        assert_matches!(
            second.propagate(StageInput::Mirror(&first), nip(200), 0, &registry),
            Err(WiseError::UnsupportedConfiguration(_))
        );
        assert!(second.wavefront().is_none());
    }
}
