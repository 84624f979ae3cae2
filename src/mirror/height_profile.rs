//! Height profiles sampled at a fixed step (figure error, roughness realizations).
//!
//! A profile is an ordered sequence of height deviations from the nominal mirror surface. The first sample
//! is located at the mirror start, subsequent samples follow at a fixed `step` along the mirror arc.
//!
//! Profiles are usually produced by an external height profile simulator and stored as a plain text file
//! of whitespace separated numbers (one or more columns). The file is read as a flat sequence of values,
//! scaled by a user-unit factor to meters.
use crate::{
    error::{WiseError, WiseResult},
    utils::{interpolation::CubicSpline, usize_to_f64},
};
use kahan::KahanSummator;
use std::{fs, path::Path};
use uom::si::{f64::Length, length::meter};

/// A height profile sampled at a fixed step.
#[derive(Debug, Clone)]
pub struct HeightProfile {
    heights: Vec<f64>,
    step: f64,
    spline: Option<CubicSpline>,
}
impl HeightProfile {
    /// Creates a new [`HeightProfile`] from heights (in meters) sampled at the given step.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the list of heights is empty or contains non-finite values.
    ///   - the step is zero, negative or not finite.
    pub fn new(heights: Vec<f64>, step: Length) -> WiseResult<Self> {
        let step = step.get::<meter>();
        if !step.is_normal() || step.is_sign_negative() {
            return Err(WiseError::Configuration(
                "height profile step must be > 0.0 and finite".into(),
            ));
        }
        if heights.is_empty() {
            return Err(WiseError::Configuration(
                "height profile must contain at least one sample".into(),
            ));
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(WiseError::Configuration(
                "height profile contains non-finite values".into(),
            ));
        }
        let spline = if heights.len() > 1 {
            let positions = (0..heights.len())
                .map(|i| usize_to_f64(i) * step)
                .collect();
            Some(CubicSpline::new(positions, heights.clone())?)
        } else {
            None
        };
        Ok(Self {
            heights,
            step,
            spline,
        })
    }
    /// Read a [`HeightProfile`] from a plain text file.
    ///
    /// All whitespace separated numbers of the file are read as a flat sequence and multiplied by `unit_scale`
    /// (user units to meters). Lines starting with `#` are ignored.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read, contains non-numeric values or the resulting
    /// profile is invalid (see [`HeightProfile::new`]).
    pub fn from_file(path: &Path, step: Length, unit_scale: f64) -> WiseResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            WiseError::Io(format!("cannot read file {} : {}", path.display(), e))
        })?;
        Self::from_string(&contents, step, unit_scale)
    }
    /// Parse a [`HeightProfile`] from the content of a height profile file.
    ///
    /// # Errors
    ///
    /// see [`HeightProfile::from_file`]
    pub fn from_string(contents: &str, step: Length, unit_scale: f64) -> WiseResult<Self> {
        if !unit_scale.is_normal() {
            return Err(WiseError::Configuration(
                "unit scale factor must be != 0.0 and finite".into(),
            ));
        }
        let heights = parse_numbers(contents)?
            .into_iter()
            .map(|h| h * unit_scale)
            .collect();
        Self::new(heights, step)
    }
    /// Returns the heights (in meters) of this [`HeightProfile`].
    #[must_use]
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }
    /// Returns the sampling step of this [`HeightProfile`].
    #[must_use]
    pub fn step(&self) -> Length {
        Length::new::<meter>(self.step)
    }
    /// Returns the extent (distance between first and last sample) of this [`HeightProfile`].
    #[must_use]
    pub fn extent(&self) -> Length {
        Length::new::<meter>(usize_to_f64(self.heights.len() - 1) * self.step)
    }
    /// Returns the positions (in meters, measured from the mirror start) of the native samples.
    #[must_use]
    pub fn positions(&self) -> Vec<f64> {
        (0..self.heights.len())
            .map(|i| usize_to_f64(i) * self.step)
            .collect()
    }
    /// Height (in meters) at the given arc positions (in meters, measured from the mirror start).
    ///
    /// Positions between native samples are interpolated with a natural cubic spline. Positions beyond the
    /// profile hold the value of the nearest end sample.
    #[must_use]
    pub fn heights_at(&self, positions: &[f64]) -> Vec<f64> {
        self.spline.as_ref().map_or_else(
            || vec![self.heights[0]; positions.len()],
            |spline| spline.evaluate_all(positions),
        )
    }
    /// Returns the rms value of the heights.
    #[must_use]
    pub fn rms(&self) -> f64 {
        let n = usize_to_f64(self.heights.len());
        let sum: f64 = self.heights.iter().kahan_sum().sum();
        let mean = sum / n;
        let squares: f64 = self
            .heights
            .iter()
            .map(|h| (h - mean) * (h - mean))
            .kahan_sum()
            .sum();
        (squares / n).sqrt()
    }
    /// Returns the rms slope error (in radians) of this profile.
    ///
    /// The slope of every sample is `atan((h[i+1]-h[i])/step)`. The last sample repeats the slope of its predecessor.
    /// A profile with a single sample has a zero slope error.
    #[must_use]
    pub fn slope_rms(&self) -> f64 {
        let n = self.heights.len();
        if n < 2 {
            return 0.0;
        }
        let mut slopes: Vec<f64> = self
            .heights
            .windows(2)
            .map(|w| ((w[1] - w[0]) / self.step).atan())
            .collect();
        slopes.push(slopes[n - 2]);
        let nf = usize_to_f64(n);
        let sum: f64 = slopes.iter().kahan_sum().sum();
        let mean = sum / nf;
        let squares: f64 = slopes
            .iter()
            .map(|s| (s - mean) * (s - mean))
            .kahan_sum()
            .sum();
        (squares / nf).sqrt()
    }
}

/// Parse all whitespace separated numbers of a text. Lines starting with `#` are skipped.
pub(crate) fn parse_numbers(contents: &str) -> WiseResult<Vec<f64>> {
    contents
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|e| WiseError::Io(format!("cannot parse value '{token}': {e}")))
        })
        .collect()
}
