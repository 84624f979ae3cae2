//! Propagation of a source field via an elliptical mirror to a detector.
//!
//! The core is the 1-D Huygens-Fresnel integral ([`huygens`]). A [`PropagatorRegistry`] dispatches a
//! [`PropagationParameters`] request to a [`Propagator`] which samples the mirror, evaluates the source field on it
//! and integrates the field on the (possibly defocused) detector line. The result is a [`Wavefront`] carrying the
//! half energy width ([`hew`]) of the detector intensity. A [`BestFocusSearch`] sweeps the detector defocus.
pub mod best_focus;
pub mod hew;
pub mod huygens;
pub mod parameters;
pub mod propagator;
pub mod sampling;
pub mod wavefront;

pub use best_focus::{
    find_best_focus, BestFocusSearch, BestFocusSeries, BestFocusStep, CancellationToken,
    DefocusSweep, DEFAULT_HEW_DECIMALS, MAX_HEW_DECIMALS,
};
pub use hew::{half_energy_width, half_energy_width_at};
pub use huygens::huygens_integral;
pub use parameters::{
    CalculationType, NumericalIntegrationParameters, PropagationParameters, PropagationType,
};
pub use propagator::{
    HuygensIntegralPropagator, PropagationAlgorithm, Propagator, PropagatorRegistry,
};
pub use sampling::{compute_sample_count, FresnelSampling, SamplingStrategy};
pub use wavefront::{DetectorField, MirrorField, Wavefront};
