//! This is the documentation for the **WISE** software package, a wavefront propagation engine for grazing
//! incidence X-ray mirrors.
//!
//! A coherent 1-D source field (analytic Gaussian beam or tabulated field) is evaluated on the surface of an
//! elliptical mirror, optionally perturbed by a figure error and a roughness realization, and propagated to a
//! detector line near the exit focus of the mirror with a Huygens-Fresnel integral. The focus quality is measured
//! by the half energy width (HEW) of the detector intensity. A best focus search sweeps the detector defocus.
//!
//! ```no_run
//! use wise::{
//!     meter, micrometer, millimeter, nanometer, radian,
//!     mirror::EllipticalMirror,
//!     propagation::{
//!         find_best_focus, CancellationToken, NumericalIntegrationParameters,
//!         PropagationParameters, PropagationType,
//!     },
//!     sources::{FieldSource, FocusCorrection, GaussianSource},
//! };
//!
//! let mirror = EllipticalMirror::new(meter!(20.0), meter!(1.0), radian!(0.01), meter!(0.2)).unwrap();
//! let mut source =
//!     GaussianSource::new(nanometer!(1.0), micrometer!(20.0), meter!(0.0, 0.0), radian!(0.0)).unwrap();
//! source.locate_at_mirror_focus(&mirror, &FocusCorrection::default());
//! let nip = NumericalIntegrationParameters::automatic(micrometer!(20.0)).unwrap();
//! let template = PropagationParameters::new(PropagationType::MirrorAndDetector, nip)
//!     .with_source(&source)
//!     .with_optical_element(&mirror);
//! let series = find_best_focus(
//!     &template,
//!     millimeter!(-10.0),
//!     millimeter!(10.0),
//!     millimeter!(1.0),
//!     4,
//!     &CancellationToken::new(),
//! )
//! .unwrap();
//! println!("best focus at {:?}", series.focus_position(mirror.f2()));
//! ```
#![allow(clippy::module_name_repetitions)]

pub mod beamline;
pub mod config;
pub mod console;
pub mod error;
pub mod mirror;
pub mod propagation;
pub mod sources;
pub mod utils;

pub use beamline::{MirrorStage, SourceStage};
pub use config::BeamlineConfig;

/// Return the version information of the currently built WISE executable.
#[must_use]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
