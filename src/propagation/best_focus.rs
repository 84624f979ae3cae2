//! Best focus search over a detector defocus sweep.
//!
//! The mirror field is computed once. For every defocus value, only the detector field is recomputed and its
//! half energy width recorded. The best focus is the sweep step with the smallest HEW.
use super::{
    parameters::{PropagationParameters, PropagationType},
    propagator::{PropagationAlgorithm, PropagatorRegistry},
    wavefront::DetectorField,
};
use crate::{
    error::{WiseError, WiseResult},
    utils::{f64_to_usize, usize_to_f64},
};
use itertools::Itertools;
use log::{debug, info, warn};
use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use uom::si::{f64::Length, length::meter};

/// Default number of decimal digits (of the HEW in meters) compared when searching the minimum HEW.
pub const DEFAULT_HEW_DECIMALS: i32 = 12;
/// Largest number of HEW decimal digits used for the comparison. Larger values are clamped.
pub const MAX_HEW_DECIMALS: i32 = 15;

/// Detector defocus values of a best focus search.
///
/// The values start at `start` and increase by `step`. `stop` is always the last value, even if it is not reached
/// by an integer number of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct DefocusSweep {
    positions: Vec<f64>,
}
impl DefocusSweep {
    /// Creates a new [`DefocusSweep`].
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - any value is not finite.
    ///   - `start` is not smaller than `stop`.
    ///   - `step` is not positive or not smaller than `stop - start`.
    pub fn new(start: Length, stop: Length, step: Length) -> WiseResult<Self> {
        let start = start.get::<meter>();
        let stop = stop.get::<meter>();
        let step = step.get::<meter>();
        if !start.is_finite() || !stop.is_finite() || !step.is_finite() {
            return Err(WiseError::Configuration(
                "defocus sweep values must be finite".into(),
            ));
        }
        if start >= stop {
            return Err(WiseError::Configuration(
                "Defocus sweep start must be smaller than stop".into(),
            ));
        }
        if step <= 0.0 {
            return Err(WiseError::Configuration(
                "Defocus step must be > 0.0".into(),
            ));
        }
        if step >= stop - start {
            return Err(WiseError::Configuration("Defocus step is too big".into()));
        }
        let n = f64_to_usize(((stop - start) / step + 1e-9).floor()) + 1;
        let mut positions: Vec<f64> = (0..n)
            .map(|i| usize_to_f64(i).mul_add(step, start))
            .collect();
        if let Some(last) = positions.last_mut() {
            if (stop - *last).abs() <= 1e-9 * step {
                *last = stop;
            }
        }
        if positions.last().is_some_and(|last| *last < stop) {
            positions.push(stop);
        }
        for position in &mut positions {
            if position.abs() < 1e-15 {
                debug!("defocus value {position} m set to 0.0");
                *position = 0.0;
            }
        }
        Ok(Self { positions })
    }
    /// Returns the defocus values (meters).
    #[must_use]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }
    /// Returns the number of sweep steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }
    /// Returns `true` if the sweep has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Cooperative cancellation flag of a best focus search.
///
/// Clones share the same flag, so a token can be handed to another thread or to an observer.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);
impl CancellationToken {
    /// Creates a new, not cancelled [`CancellationToken`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    /// Returns `true` if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one step of a best focus search.
#[derive(Debug, Clone, PartialEq)]
pub struct BestFocusStep {
    /// detector defocus of this step
    pub defocus: Length,
    /// detector field of this step
    pub detector: DetectorField,
}
impl BestFocusStep {
    /// Returns the half energy width of this step.
    #[must_use]
    pub fn hew(&self) -> Length {
        Length::new::<meter>(self.detector.hew)
    }
    /// Returns the detector positions of this step.
    #[must_use]
    pub fn positions(&self) -> &[f64] {
        &self.detector.s
    }
}

/// Results of a (possibly cancelled) best focus search.
#[derive(Debug, Clone, PartialEq)]
pub struct BestFocusSeries {
    steps: Vec<BestFocusStep>,
    hew_decimals: i32,
    cancelled: bool,
}
impl BestFocusSeries {
    /// Returns the computed steps in sweep order.
    #[must_use]
    pub fn steps(&self) -> &[BestFocusStep] {
        &self.steps
    }
    /// Returns the number of computed steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }
    /// Returns `true` if no step was computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    /// Returns `true` if the search was cancelled before the end of the sweep.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
    /// Index of the step with the smallest HEW.
    ///
    /// The HEW values are rounded to the configured number of decimals (clamped to `0..=`[`MAX_HEW_DECIMALS`])
    /// before comparison. If several steps share the minimum, the central one of them is selected. Returns `None`
    /// if no step was computed.
    #[must_use]
    pub fn best_index(&self) -> Option<usize> {
        let scale = 10f64.powi(self.hew_decimals.clamp(0, MAX_HEW_DECIMALS));
        let rounded: Vec<f64> = self
            .steps
            .iter()
            .map(|s| (s.detector.hew * scale).round() / scale)
            .collect();
        let minimum = rounded.iter().copied().reduce(f64::min)?;
        let ties: Vec<usize> = rounded.iter().positions(|h| *h == minimum).collect();
        ties.get((ties.len().saturating_sub(1)) / 2).copied()
    }
    /// Returns the step with the smallest HEW (see [`BestFocusSeries::best_index`]).
    #[must_use]
    pub fn best(&self) -> Option<&BestFocusStep> {
        self.best_index().and_then(|i| self.steps.get(i))
    }
    /// Distance of the best focus from the mirror center, given the nominal exit focal distance `f2`.
    #[must_use]
    pub fn focus_position(&self, f2: Length) -> Option<Length> {
        self.best().map(|step| f2 + step.defocus)
    }
    /// Write every step to `best_focus_partial_result_<index>.dat` in `dir`.
    ///
    /// Each file has a two line header with the defocus and the HEW followed by `<position> <intensity>` rows.
    ///
    /// # Errors
    ///
    /// This function will return an error if the directory cannot be created or a file cannot be written.
    pub fn save_to_dir(&self, dir: &Path) -> WiseResult<()> {
        fs::create_dir_all(dir).map_err(|e| {
            WiseError::Io(format!("cannot create directory {} : {}", dir.display(), e))
        })?;
        for (i, step) in self.steps.iter().enumerate() {
            let header = [
                format!("Defocus Sweep: {} [m]", step.defocus.get::<meter>()),
                format!("HEW: {}", step.detector.hew),
            ];
            step.detector
                .save_profile(&dir.join(format!("best_focus_partial_result_{i}.dat")), &header)?;
        }
        Ok(())
    }
}

/// Best focus search using the propagators of a [`PropagatorRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct BestFocusSearch<'a> {
    registry: &'a PropagatorRegistry,
    algorithm: PropagationAlgorithm,
    hew_decimals: i32,
}
impl<'a> BestFocusSearch<'a> {
    /// Creates a new [`BestFocusSearch`] using the default algorithm and [`DEFAULT_HEW_DECIMALS`].
    #[must_use]
    pub fn new(registry: &'a PropagatorRegistry) -> Self {
        Self {
            registry,
            algorithm: PropagationAlgorithm::default(),
            hew_decimals: DEFAULT_HEW_DECIMALS,
        }
    }
    /// Use the given propagation algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: PropagationAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
    /// Set the number of decimal digits (of the HEW in meters) compared when searching the minimum.
    #[must_use]
    pub const fn with_hew_decimals(mut self, hew_decimals: i32) -> Self {
        self.hew_decimals = hew_decimals;
        self
    }
    /// Run the search.
    ///
    /// `template` provides the source, the mirror, the numerical integration parameters and the number of
    /// workers. Its propagation type, defocus and wavefront are ignored. The cancellation token is checked before
    /// every sweep step. `observer` is called with the step index after every computed step.
    ///
    /// # Errors
    ///
    /// This function will return an error if any propagation fails. A cancellation is not an error: the steps
    /// computed so far are returned.
    pub fn run<F>(
        &self,
        template: &PropagationParameters,
        sweep: &DefocusSweep,
        token: &CancellationToken,
        mut observer: F,
    ) -> WiseResult<BestFocusSeries>
    where
        F: FnMut(usize, &BestFocusStep),
    {
        let mirror_params = template
            .clone()
            .with_propagation_type(PropagationType::MirrorOnly)
            .with_defocus(Length::new::<meter>(0.0));
        let mirror_wavefront = self.registry.propagate(&mirror_params, self.algorithm)?;
        let mut series = BestFocusSeries {
            steps: Vec::with_capacity(sweep.len()),
            hew_decimals: self.hew_decimals,
            cancelled: false,
        };
        for (i, defocus) in sweep.positions().iter().enumerate() {
            if token.is_cancelled() {
                warn!(
                    "best focus search cancelled after {i} of {} steps",
                    sweep.len()
                );
                series.cancelled = true;
                break;
            }
            let defocus = Length::new::<meter>(*defocus);
            let params = template
                .clone()
                .with_propagation_type(PropagationType::DetectorOnly)
                .with_wavefront(&mirror_wavefront)
                .with_defocus(defocus);
            let detector = self
                .registry
                .propagate(&params, self.algorithm)?
                .into_detector()
                .ok_or_else(|| {
                    WiseError::Other("propagation did not compute a detector field".into())
                })?;
            let step = BestFocusStep { defocus, detector };
            info!(
                "best focus step {}/{}: defocus {} m, HEW {} m",
                i + 1,
                sweep.len(),
                defocus.get::<meter>(),
                step.detector.hew
            );
            observer(i, &step);
            series.steps.push(step);
        }
        if let Some(best) = series.best() {
            info!(
                "best focus at defocus {} m, HEW {} m",
                best.defocus.get::<meter>(),
                best.detector.hew
            );
        }
        Ok(series)
    }
}

/// Search the best focus over the defocus range `[start, stop]` with the given `step` using the shared
/// propagator registry and `workers` threads.
///
/// # Errors
///
/// This function will return an error if the sweep is invalid or any propagation fails.
pub fn find_best_focus(
    template: &PropagationParameters,
    start: Length,
    stop: Length,
    step: Length,
    workers: usize,
    token: &CancellationToken,
) -> WiseResult<BestFocusSeries> {
    let sweep = DefocusSweep::new(start, stop, step)?;
    let template = template.clone().with_workers(workers);
    BestFocusSearch::new(PropagatorRegistry::shared()).run(&template, &sweep, token, |_, _| {})
}
