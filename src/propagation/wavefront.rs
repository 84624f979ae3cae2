//! Result of a propagation.
use crate::error::{WiseError, WiseResult};
use num::complex::Complex64;
use std::{fmt::Write as _, fs, path::Path};
use uom::si::{f64::Length, length::meter};

/// Field sampled on the mirror surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorField {
    /// lab x coordinates of the surface samples
    pub x: Vec<f64>,
    /// lab y coordinates of the surface samples
    pub y: Vec<f64>,
    /// arc length positions of the surface samples
    pub s: Vec<f64>,
    /// complex source field at the surface samples
    pub field: Vec<Complex64>,
    /// height deviations from the nominal surface at the surface samples
    pub residuals: Vec<f64>,
}

/// Field sampled on the detector line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorField {
    /// lab x coordinates of the detector samples
    pub x: Vec<f64>,
    /// lab y coordinates of the detector samples
    pub y: Vec<f64>,
    /// positions of the detector samples along the detector line
    pub s: Vec<f64>,
    /// complex field at the detector samples
    pub field: Vec<Complex64>,
    /// half energy width of the detector intensity
    pub hew: f64,
}
impl DetectorField {
    /// Intensity (`|E|²`) at the detector samples.
    #[must_use]
    pub fn intensity(&self) -> Vec<f64> {
        self.field.iter().map(Complex64::norm_sqr).collect()
    }
    /// Plain text profile: the given comment lines (prefixed with `# `) followed by `<position> <intensity>` rows.
    #[must_use]
    pub fn profile_string(&self, header: &[String]) -> String {
        let mut text = String::new();
        for line in header {
            let _ = writeln!(text, "# {line}");
        }
        for (s, i) in self.s.iter().zip(self.intensity()) {
            let _ = writeln!(text, "{s} {i}");
        }
        text
    }
    /// Write the intensity profile to a file (see [`DetectorField::profile_string`]).
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be written.
    pub fn save_profile(&self, path: &Path, header: &[String]) -> WiseResult<()> {
        fs::write(path, self.profile_string(header)).map_err(|e| {
            WiseError::Io(format!("cannot write file {} : {}", path.display(), e))
        })
    }
}

/// Output of a propagation.
///
/// The mirror field is only present if the mirror was sampled by the propagation, the detector field only if the
/// detector was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefront {
    wavelength: Length,
    number_of_points: usize,
    mirror: Option<MirrorField>,
    detector: Option<DetectorField>,
}
impl Wavefront {
    /// Creates a new [`Wavefront`].
    #[must_use]
    pub const fn new(
        wavelength: Length,
        number_of_points: usize,
        mirror: Option<MirrorField>,
        detector: Option<DetectorField>,
    ) -> Self {
        Self {
            wavelength,
            number_of_points,
            mirror,
            detector,
        }
    }
    /// Returns the wavelength of this [`Wavefront`].
    #[must_use]
    pub const fn wavelength(&self) -> Length {
        self.wavelength
    }
    /// Returns the number of mirror and detector samples used.
    #[must_use]
    pub const fn number_of_points(&self) -> usize {
        self.number_of_points
    }
    /// Returns the mirror field, if computed.
    #[must_use]
    pub const fn mirror(&self) -> Option<&MirrorField> {
        self.mirror.as_ref()
    }
    /// Returns the detector field, if computed.
    #[must_use]
    pub const fn detector(&self) -> Option<&DetectorField> {
        self.detector.as_ref()
    }
    /// Returns the half energy width at the detector, if computed.
    #[must_use]
    pub fn hew(&self) -> Option<Length> {
        self.detector.as_ref().map(|d| Length::new::<meter>(d.hew))
    }
    /// Consumes this [`Wavefront`] and returns its detector field, if computed.
    #[must_use]
    pub fn into_detector(self) -> Option<DetectorField> {
        self.detector
    }
}
