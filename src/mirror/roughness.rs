//! Mirror roughness described by a power spectral density (PSD).
//!
//! The PSD only describes the statistics of the surface. Stochastic height realizations are produced by an
//! external [`RoughnessSynthesizer`] and attached to the [`Roughness`] as a [`HeightProfile`]. Only an attached
//! realization modifies the mirror surface.
use super::height_profile::{parse_numbers, HeightProfile};
use crate::{
    error::{WiseError, WiseResult},
    utils::{interpolation::interp_linear, usize_to_f64},
};
use kahan::KahanSummator;
use std::{fs, path::Path};
use uom::si::f64::Length;

/// Power law `PSD(f) = k * f^(-beta)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    /// scale factor
    pub k: f64,
    /// spectral exponent
    pub beta: f64,
}
impl PowerLaw {
    /// Fit a power law to the given spectrum by a least squares fit in log-log space.
    ///
    /// Only samples with positive frequency and positive PSD value are used.
    ///
    /// # Errors
    ///
    /// This function will return an error if less than two usable samples exist or all usable frequencies are equal.
    pub fn fit(frequencies: &[f64], psd: &[f64]) -> WiseResult<Self> {
        let (lx, ly): (Vec<f64>, Vec<f64>) = frequencies
            .iter()
            .zip(psd)
            .filter(|(f, p)| **f > 0.0 && **p > 0.0)
            .map(|(f, p)| (f.log10(), p.log10()))
            .unzip();
        if lx.len() < 2 {
            return Err(WiseError::Configuration(
                "power law fit needs at least two samples with positive frequency and PSD".into(),
            ));
        }
        let n = usize_to_f64(lx.len());
        let sum_x: f64 = lx.iter().kahan_sum().sum();
        let sum_y: f64 = ly.iter().kahan_sum().sum();
        let mean_x = sum_x / n;
        let mean_y = sum_y / n;
        let sxx: f64 = lx.iter().map(|x| (x - mean_x).powi(2)).kahan_sum().sum();
        let sxy: f64 = lx
            .iter()
            .zip(&ly)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .kahan_sum()
            .sum();
        if sxx == 0.0 {
            return Err(WiseError::Configuration(
                "power law fit needs at least two distinct frequencies".into(),
            ));
        }
        let slope = sxy / sxx;
        let intercept = slope.mul_add(-mean_x, mean_y);
        Ok(Self {
            k: 10f64.powf(intercept),
            beta: -slope,
        })
    }
    /// Evaluate the power law at frequency `f`.
    #[must_use]
    pub fn value(&self, f: f64) -> f64 {
        self.k * f.powf(-self.beta)
    }
}

/// Generator of stochastic height realizations for a given roughness model.
pub trait RoughnessSynthesizer {
    /// Create a height realization (in meters) covering `length` sampled at `step`.
    ///
    /// # Errors
    ///
    /// This function will return an error if no realization can be produced for the given model and sampling.
    fn synthesize(&self, roughness: &Roughness, length: Length, step: Length)
        -> WiseResult<Vec<f64>>;
}

/// Roughness model of a mirror.
#[derive(Debug, Clone)]
pub struct Roughness {
    frequencies: Vec<f64>,
    psd: Vec<f64>,
    power_law: Option<PowerLaw>,
    realization: Option<HeightProfile>,
}
impl Roughness {
    /// Creates a new [`Roughness`] model from a tabulated PSD.
    ///
    /// Frequencies are multiplied by `x_scale`, PSD values by `y_scale`. If `fit_power_law` is set, a
    /// [`PowerLaw`] is fitted to the scaled spectrum and used as model PSD.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the frequency and PSD arrays have different length or less than two samples.
    ///   - any value is not finite, a frequency is negative or the frequencies are not strictly increasing.
    ///   - a PSD value is negative.
    ///   - a scale factor is not positive.
    ///   - the power law fit fails.
    pub fn new(
        frequencies: &[f64],
        psd: &[f64],
        x_scale: f64,
        y_scale: f64,
        fit_power_law: bool,
    ) -> WiseResult<Self> {
        if frequencies.len() != psd.len() || frequencies.len() < 2 {
            return Err(WiseError::Configuration(
                "PSD needs at least two (frequency, value) pairs".into(),
            ));
        }
        if !(x_scale.is_normal() && x_scale > 0.0 && y_scale.is_normal() && y_scale > 0.0) {
            return Err(WiseError::Configuration(
                "PSD scale factors must be > 0.0 and finite".into(),
            ));
        }
        if frequencies
            .iter()
            .chain(psd.iter())
            .any(|v| !v.is_finite() || v.is_sign_negative())
        {
            return Err(WiseError::Configuration(
                "PSD data must be finite and >= 0.0".into(),
            ));
        }
        if frequencies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(WiseError::Configuration(
                "PSD frequencies must be strictly increasing".into(),
            ));
        }
        let frequencies: Vec<f64> = frequencies.iter().map(|f| f * x_scale).collect();
        let psd: Vec<f64> = psd.iter().map(|p| p * y_scale).collect();
        let power_law = if fit_power_law {
            Some(PowerLaw::fit(&frequencies, &psd)?)
        } else {
            None
        };
        Ok(Self {
            frequencies,
            psd,
            power_law,
            realization: None,
        })
    }
    /// Read a [`Roughness`] model from a two column (frequency, PSD) text file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or parsed or the data is invalid
    /// (see [`Roughness::new`]).
    pub fn from_file(
        path: &Path,
        x_scale: f64,
        y_scale: f64,
        fit_power_law: bool,
    ) -> WiseResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            WiseError::Io(format!("cannot read file {} : {}", path.display(), e))
        })?;
        Self::from_string(&contents, x_scale, y_scale, fit_power_law)
    }
    /// Parse a [`Roughness`] model from the content of a two column PSD file.
    ///
    /// # Errors
    ///
    /// see [`Roughness::from_file`]
    pub fn from_string(
        contents: &str,
        x_scale: f64,
        y_scale: f64,
        fit_power_law: bool,
    ) -> WiseResult<Self> {
        let values = parse_numbers(contents)?;
        if values.len() % 2 != 0 {
            return Err(WiseError::Io(
                "PSD data must consist of (frequency, value) pairs".into(),
            ));
        }
        let (frequencies, psd): (Vec<f64>, Vec<f64>) =
            values.chunks_exact(2).map(|c| (c[0], c[1])).unzip();
        Self::new(&frequencies, &psd, x_scale, y_scale, fit_power_law)
    }
    /// Returns the (scaled) tabulated frequencies.
    #[must_use]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }
    /// Returns the (scaled) tabulated PSD values.
    #[must_use]
    pub fn psd(&self) -> &[f64] {
        &self.psd
    }
    /// Returns the fitted power law, if the model was created with a fit.
    #[must_use]
    pub const fn power_law(&self) -> Option<&PowerLaw> {
        self.power_law.as_ref()
    }
    /// Model PSD at frequency `f`.
    ///
    /// Returns the fitted power law if present, otherwise the tabulated spectrum is interpolated linearly.
    #[must_use]
    pub fn psd_at(&self, f: f64) -> f64 {
        self.power_law.map_or_else(
            || interp_linear(&self.frequencies, &self.psd, f),
            |law| law.value(f),
        )
    }
    /// rms height of the model, the square root of the PSD integral over the tabulated frequency range.
    ///
    /// With a power law model, only the positive part of the frequency range is integrated.
    #[must_use]
    pub fn rms(&self) -> f64 {
        let (f, p): (Vec<f64>, Vec<f64>) = self
            .frequencies
            .iter()
            .filter(|f| self.power_law.is_none() || **f > 0.0)
            .map(|f| (*f, self.psd_at(*f)))
            .unzip();
        let integral: f64 = f
            .windows(2)
            .zip(p.windows(2))
            .map(|(f, p)| 0.5 * (f[1] - f[0]) * (p[0] + p[1]))
            .kahan_sum()
            .sum();
        integral.sqrt()
    }
    /// Attach a height realization of this roughness.
    #[must_use]
    pub fn with_realization(mut self, realization: HeightProfile) -> Self {
        self.realization = Some(realization);
        self
    }
    /// Create a new realization of this model with the given synthesizer and attach it.
    ///
    /// # Errors
    ///
    /// This function will return an error if the synthesizer fails or returns an invalid profile.
    pub fn synthesize_realization(
        &mut self,
        synthesizer: &dyn RoughnessSynthesizer,
        length: Length,
        step: Length,
    ) -> WiseResult<()> {
        let heights = synthesizer.synthesize(self, length, step)?;
        self.realization = Some(HeightProfile::new(heights, step)?);
        Ok(())
    }
    /// Returns the attached height realization, if any.
    #[must_use]
    pub const fn realization(&self) -> Option<&HeightProfile> {
        self.realization.as_ref()
    }
}
