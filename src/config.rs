#![warn(missing_docs)]
//! Beamline configuration documents.
//!
//! A [`BeamlineConfig`] describes a source, its placement, an elliptical mirror (optionally with figure error and
//! roughness), the numerical integration parameters and an optional best focus sweep. It is read from and written
//! to YAML files. Lengths are given in meters. File paths are relative to the directory of the configuration file.
use crate::{
    beamline::{SourcePlacement, SourceStage},
    error::{WiseError, WiseResult},
    mirror::{EllipticalMirror, HeightProfile, Roughness},
    propagation::{
        CalculationType, DefocusSweep, NumericalIntegrationParameters, DEFAULT_HEW_DECIMALS,
    },
    sources::{FocusCorrection, GaussianSource, Source, TabulatedSource},
};
use log::warn;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use uom::si::{
    angle::{degree, radian},
    f64::{Angle, Length},
    length::meter,
};

fn zero_length() -> Length {
    Length::new::<meter>(0.0)
}
const fn one() -> f64 {
    1.0
}
const fn default_hew_decimals() -> i32 {
    DEFAULT_HEW_DECIMALS
}
fn file_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Source description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// analytic Gaussian beam with its waist at the origin
    Gaussian {
        /// wavelength
        wavelength: Length,
        /// rms size of the intensity profile at the waist
        sigma: Length,
        /// origin `(z, y)`
        #[serde(default = "zero_point")]
        origin: [Length; 2],
        /// direction of the optical axis (radians)
        #[serde(default)]
        theta: f64,
    },
    /// sampled field read from a file with the columns abscissa, real and imaginary part
    Tabulated {
        /// wavelength
        wavelength: Length,
        /// field file
        field_file: PathBuf,
        /// factor converting the abscissas of the file to meters
        #[serde(default = "one")]
        units_converter: f64,
        /// peak intensity after import
        #[serde(default)]
        normalization: Option<f64>,
        /// keep only the amplitude of the imported field
        #[serde(default)]
        reset_phase: bool,
        /// origin `(z, y)`
        #[serde(default = "zero_point")]
        origin: [Length; 2],
        /// direction of the optical axis (radians)
        #[serde(default)]
        theta: f64,
    },
}
fn zero_point() -> [Length; 2] {
    [zero_length(), zero_length()]
}

/// Source placement description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlacementConfig {
    /// keep the origin and direction of the source description
    #[default]
    UserDefined,
    /// place the source at the entrance focus of the mirror
    AtMirrorFocus {
        /// shift along the incident chief ray
        #[serde(default = "zero_length")]
        longitudinal: Length,
        /// shift perpendicular to the incident chief ray
        #[serde(default = "zero_length")]
        transverse: Length,
        /// tilt of the source axis in degrees
        #[serde(default)]
        delta_theta_deg: f64,
    },
}

/// Height profile file description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightProfileConfig {
    /// height profile file
    pub file: PathBuf,
    /// distance of the samples
    pub step: Length,
    /// factor converting the heights of the file to meters
    #[serde(default = "one")]
    pub unit_scale: f64,
}

/// Roughness description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoughnessConfig {
    /// file with the columns spatial frequency and PSD
    pub psd_file: PathBuf,
    /// factor converting the frequencies of the file to 1/m
    #[serde(default = "one")]
    pub x_scale: f64,
    /// factor converting the PSD values of the file to m³
    #[serde(default = "one")]
    pub y_scale: f64,
    /// fit a power law to the PSD
    #[serde(default)]
    pub fit_power_law: bool,
    /// externally synthesized roughness heights
    #[serde(default)]
    pub realization: Option<HeightProfileConfig>,
}

/// Elliptical mirror description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// distance entrance focus - mirror center
    pub f1: Length,
    /// distance mirror center - exit focus
    pub f2: Length,
    /// grazing incidence angle in degrees
    pub grazing_angle_deg: f64,
    /// mirror length
    pub length: Length,
    /// figure error
    #[serde(default)]
    pub figure_error: Option<HeightProfileConfig>,
    /// roughness
    #[serde(default)]
    pub roughness: Option<RoughnessConfig>,
}

/// Numerical integration description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalIntegrationConfig {
    /// how the number of points is determined
    #[serde(default)]
    pub calculation_type: CalculationType,
    /// detector width
    pub detector_size: Length,
    /// number of points for [`CalculationType::UserDefined`]
    #[serde(default)]
    pub number_of_points: Option<usize>,
}

/// Best focus sweep description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFocusConfig {
    /// first defocus value
    pub start: Length,
    /// last defocus value
    pub stop: Length,
    /// defocus increment
    pub step: Length,
    /// write the detector profile of every sweep step
    #[serde(default)]
    pub save_partial_results: bool,
}

/// A beamline configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamlineConfig {
    #[serde(default = "file_version")]
    wise_file_version: String,
    /// source
    pub source: SourceConfig,
    /// source placement
    #[serde(default)]
    pub placement: PlacementConfig,
    /// mirror
    pub mirror: MirrorConfig,
    /// numerical integration parameters
    pub numerical_integration: NumericalIntegrationConfig,
    /// detector defocus
    #[serde(default = "zero_length")]
    pub defocus: Length,
    /// best focus sweep
    #[serde(default)]
    pub best_focus: Option<BestFocusConfig>,
    /// number of worker threads (0 or 1: single threaded)
    #[serde(default)]
    pub workers: usize,
    /// decimal digits of the HEW (in meters) compared during a best focus search
    #[serde(default = "default_hew_decimals")]
    pub hew_decimals: i32,
    #[serde(skip)]
    base_dir: PathBuf,
}
impl BeamlineConfig {
    /// Creates a new [`BeamlineConfig`] without best focus sweep, defocus and file references.
    #[must_use]
    pub fn new(
        source: SourceConfig,
        placement: PlacementConfig,
        mirror: MirrorConfig,
        numerical_integration: NumericalIntegrationConfig,
    ) -> Self {
        Self {
            wise_file_version: file_version(),
            source,
            placement,
            mirror,
            numerical_integration,
            defocus: zero_length(),
            best_focus: None,
            workers: 0,
            hew_decimals: DEFAULT_HEW_DECIMALS,
            base_dir: PathBuf::new(),
        }
    }
    /// Read a [`BeamlineConfig`] from a YAML file.
    ///
    /// Relative file paths in the document are resolved against the directory of `path`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the given path is not found or readable.
    ///   - the parsing of the file failed.
    pub fn from_file(path: &Path) -> WiseResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WiseError::Config(format!("cannot read file {} : {}", path.display(), e))
        })?;
        let mut config = Self::from_string(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }
    /// Parse a [`BeamlineConfig`] from a YAML string.
    ///
    /// Relative file paths are resolved against the current directory.
    ///
    /// # Errors
    ///
    /// This function will return an error if the parsing failed.
    pub fn from_string(contents: &str) -> WiseResult<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| WiseError::Config(format!("parsing of beamline failed: {e}")))?;
        if config.wise_file_version != file_version() {
            warn!(
                "beamline file version '{}' differs from program version '{}'",
                config.wise_file_version,
                file_version()
            );
        }
        Ok(config)
    }
    /// Serialize this [`BeamlineConfig`] to a YAML string.
    ///
    /// # Errors
    ///
    /// This function will return an error if the serialization failed.
    pub fn to_yaml_string(&self) -> WiseResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| WiseError::Config(format!("serialization of beamline failed: {e}")))
    }
    /// Save this [`BeamlineConfig`] to a YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the serialization failed or the file cannot be written.
    pub fn save_to_file(&self, path: &Path) -> WiseResult<()> {
        let serialized = self.to_yaml_string()?;
        let mut output = File::create(path).map_err(|e| {
            WiseError::Config(format!("could not create file {}: {}", path.display(), e))
        })?;
        write!(output, "{serialized}").map_err(|e| {
            WiseError::Config(format!("writing to file {} failed: {}", path.display(), e))
        })
    }
    /// Returns the directory relative file paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
    /// Build the source described by this document.
    ///
    /// # Errors
    ///
    /// This function will return an error if the source parameters are invalid or the field file cannot be read.
    pub fn source(&self) -> WiseResult<Source> {
        match &self.source {
            SourceConfig::Gaussian {
                wavelength,
                sigma,
                origin,
                theta,
            } => Ok(GaussianSource::from_sigma(
                *wavelength,
                *sigma,
                Point2::new(origin[0], origin[1]),
                Angle::new::<radian>(*theta),
            )?
            .into()),
            SourceConfig::Tabulated {
                wavelength,
                field_file,
                units_converter,
                normalization,
                reset_phase,
                origin,
                theta,
            } => {
                let mut source = TabulatedSource::from_file(
                    &self.resolve(field_file),
                    *wavelength,
                    Point2::new(origin[0], origin[1]),
                    Angle::new::<radian>(*theta),
                )?
                .with_units_converter(*units_converter)?;
                if let Some(normalization) = normalization {
                    source = source.normalized(*normalization)?;
                }
                if *reset_phase {
                    source = source.with_reset_phase();
                }
                Ok(source.into())
            }
        }
    }
    /// Returns the source placement described by this document.
    #[must_use]
    pub fn placement(&self) -> SourcePlacement {
        match &self.placement {
            PlacementConfig::UserDefined => SourcePlacement::UserDefined,
            PlacementConfig::AtMirrorFocus {
                longitudinal,
                transverse,
                delta_theta_deg,
            } => SourcePlacement::AtMirrorFocus(FocusCorrection {
                longitudinal: *longitudinal,
                transverse: *transverse,
                angle: Angle::new::<degree>(*delta_theta_deg),
            }),
        }
    }
    /// Build the source stage described by this document.
    ///
    /// # Errors
    ///
    /// see [`BeamlineConfig::source`]
    pub fn source_stage(&self) -> WiseResult<SourceStage> {
        Ok(SourceStage::new(self.source()?, self.placement()))
    }
    /// Build the mirror (including figure error and roughness) described by this document.
    ///
    /// # Errors
    ///
    /// This function will return an error if the mirror parameters are invalid or a referenced file cannot be read.
    pub fn mirror(&self) -> WiseResult<EllipticalMirror> {
        let m = &self.mirror;
        let mut mirror = EllipticalMirror::new(
            m.f1,
            m.f2,
            Angle::new::<degree>(m.grazing_angle_deg),
            m.length,
        )?;
        if let Some(figure_error) = &m.figure_error {
            mirror = mirror.with_figure_error(self.height_profile(figure_error)?);
        }
        if let Some(r) = &m.roughness {
            let mut roughness = Roughness::from_file(
                &self.resolve(&r.psd_file),
                r.x_scale,
                r.y_scale,
                r.fit_power_law,
            )?;
            if let Some(realization) = &r.realization {
                roughness = roughness.with_realization(self.height_profile(realization)?);
            }
            mirror = mirror.with_roughness(roughness);
        }
        Ok(mirror)
    }
    fn height_profile(&self, config: &HeightProfileConfig) -> WiseResult<HeightProfile> {
        HeightProfile::from_file(&self.resolve(&config.file), config.step, config.unit_scale)
    }
    /// Build the numerical integration parameters described by this document.
    ///
    /// # Errors
    ///
    /// This function will return an error if the parameters are invalid or the number of points is missing for
    /// [`CalculationType::UserDefined`].
    pub fn numerical_integration(&self) -> WiseResult<NumericalIntegrationParameters> {
        let n = &self.numerical_integration;
        match n.calculation_type {
            CalculationType::Automatic => NumericalIntegrationParameters::automatic(n.detector_size),
            CalculationType::UserDefined => {
                let points = n.number_of_points.ok_or_else(|| {
                    WiseError::Config(
                        "number_of_points is required for user defined numerical integration".into(),
                    )
                })?;
                NumericalIntegrationParameters::user_defined(n.detector_size, points)
            }
        }
    }
    /// Build the best focus sweep, if described by this document.
    ///
    /// # Errors
    ///
    /// This function will return an error if the sweep parameters are invalid.
    pub fn defocus_sweep(&self) -> WiseResult<Option<DefocusSweep>> {
        self.best_focus
            .as_ref()
            .map(|b| DefocusSweep::new(b.start, b.stop, b.step))
            .transpose()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        meter, micrometer, millimeter, nanometer,
        sources::FieldSource,
        utils::test_helper::test_helper::check_warnings,
    };
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use std::fs;

    fn config() -> BeamlineConfig {
        BeamlineConfig::new(
            SourceConfig::Gaussian {
                wavelength: nanometer!(1.0),
                sigma: micrometer!(10.0),
                origin: zero_point(),
                theta: 0.0,
            },
            PlacementConfig::AtMirrorFocus {
                longitudinal: zero_length(),
                transverse: zero_length(),
                delta_theta_deg: 0.0,
            },
            MirrorConfig {
                f1: meter!(20.0),
                f2: meter!(1.0),
                grazing_angle_deg: 0.01f64.to_degrees(),
                length: meter!(0.2),
                figure_error: None,
                roughness: None,
            },
            NumericalIntegrationConfig {
                calculation_type: CalculationType::UserDefined,
                detector_size: micrometer!(20.0),
                number_of_points: Some(400),
            },
        )
    }
    #[test]
    fn yaml_round_trip() {
        let mut c = config();
        c.best_focus = Some(BestFocusConfig {
            start: millimeter!(-10.0),
            stop: millimeter!(10.0),
            step: millimeter!(1.0),
            save_partial_results: true,
        });
        let yaml = c.to_yaml_string().unwrap();
        assert!(yaml.contains("kind: gaussian"));
        assert!(yaml.contains("mode: at_mirror_focus"));
        assert!(yaml.contains("calculation_type: user_defined"));
        assert_eq!(BeamlineConfig::from_string(&yaml).unwrap(), c);
    }
    #[test]
    fn minimal_document() {
        let yaml = r"
source:
  kind: gaussian
  wavelength: 1.0e-9
  sigma: 1.0e-5
mirror:
  f1: 20.0
  f2: 1.0
  grazing_angle_deg: 0.5
  length: 0.2
numerical_integration:
  detector_size: 2.0e-5
";
        testing_logger::setup();
        let c = BeamlineConfig::from_string(yaml).unwrap();
        check_warnings(&[]);
        assert_eq!(c.placement, PlacementConfig::UserDefined);
        assert_eq!(c.placement(), SourcePlacement::UserDefined);
        assert_eq!(c.workers, 0);
        assert_eq!(c.hew_decimals, DEFAULT_HEW_DECIMALS);
        assert_eq!(c.defocus, meter!(0.0));
        assert!(c.defocus_sweep().unwrap().is_none());
        let nip = c.numerical_integration().unwrap();
        assert_eq!(nip.calculation_type(), CalculationType::Automatic);
        let source = c.source().unwrap();
        assert_abs_diff_eq!(source.waist().get::<meter>(), 2.0e-5);
        let mirror = c.mirror().unwrap();
        assert_abs_diff_eq!(mirror.grazing_angle().get::<degree>(), 0.5, epsilon = 1e-12);
    }
    #[test]
    fn version_mismatch() {
        let mut c = config();
        c.wise_file_version = "0.0.0".into();
        let yaml = c.to_yaml_string().unwrap();
        testing_logger::setup();
        assert!(BeamlineConfig::from_string(&yaml).is_ok());
        let expected = format!(
            "beamline file version '0.0.0' differs from program version '{}'",
            file_version()
        );
        check_warnings(&[expected.as_str()]);
    }
    #[test]
    fn wrong_documents() {
        assert_matches!(
            BeamlineConfig::from_string("source: 1"),
            Err(WiseError::Config(_))
        );
        assert_matches!(
            BeamlineConfig::from_file(Path::new("./no_such_beamline.yaml")),
            Err(WiseError::Config(_))
        );
        let mut c = config();
        c.numerical_integration.number_of_points = None;
        assert_matches!(c.numerical_integration(), Err(WiseError::Config(_)));
        c.mirror.grazing_angle_deg = 95.0;
        assert_matches!(c.mirror(), Err(WiseError::Configuration(_)));
        c.best_focus = Some(BestFocusConfig {
            start: millimeter!(1.0),
            stop: millimeter!(-1.0),
            step: millimeter!(1.0),
            save_partial_results: false,
        });
        assert_matches!(c.defocus_sweep(), Err(WiseError::Configuration(_)));
    }
    #[test]
    fn placement_correction() {
        let mut c = config();
        c.placement = PlacementConfig::AtMirrorFocus {
            longitudinal: millimeter!(1.0),
            transverse: micrometer!(-5.0),
            delta_theta_deg: 0.1,
        };
        let SourcePlacement::AtMirrorFocus(correction) = c.placement() else {
            panic!("wrong placement");
        };
        assert_eq!(correction.longitudinal, millimeter!(1.0));
        assert_eq!(correction.transverse, micrometer!(-5.0));
        assert_abs_diff_eq!(correction.angle.get::<degree>(), 0.1, epsilon = 1e-12);
        let stage = c.source_stage().unwrap();
        let mirror = c.mirror().unwrap();
        assert_abs_diff_eq!(
            (stage.placed_for(&mirror).origin() - mirror.focus1()).norm(),
            (1e-3f64).hypot(5e-6),
            epsilon = 1e-12
        );
    }
    #[test]
    fn files_relative_to_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("figure.dat"), "0.0 1.0\n2.0 1.0\n").unwrap();
        fs::write(dir.path().join("psd.dat"), "1.0 1.0\n10.0 0.01\n100.0 0.0001\n").unwrap();
        fs::write(dir.path().join("field.dat"), "-1.0 1.0 0.0\n0.0 2.0 0.0\n1.0 1.0 0.0\n").unwrap();
        let mut c = config();
        c.source = SourceConfig::Tabulated {
            wavelength: nanometer!(1.0),
            field_file: PathBuf::from("field.dat"),
            units_converter: 1e-6,
            normalization: Some(1.0),
            reset_phase: true,
            origin: zero_point(),
            theta: 0.0,
        };
        c.mirror.figure_error = Some(HeightProfileConfig {
            file: PathBuf::from("figure.dat"),
            step: millimeter!(50.0),
            unit_scale: 1e-9,
        });
        c.mirror.roughness = Some(RoughnessConfig {
            psd_file: PathBuf::from("psd.dat"),
            x_scale: 1.0,
            y_scale: 1.0,
            fit_power_law: true,
            realization: None,
        });
        let path = dir.path().join("beamline.yaml");
        c.save_to_file(&path).unwrap();
        let c = BeamlineConfig::from_file(&path).unwrap();
        assert_eq!(c.base_dir(), dir.path());
        let mirror = c.mirror().unwrap();
        let figure_error = mirror.figure_error().unwrap();
        assert_eq!(figure_error.heights().len(), 4);
        assert_abs_diff_eq!(figure_error.heights()[1], 1e-9);
        let power_law = mirror.roughness().unwrap().power_law().unwrap();
        assert_abs_diff_eq!(power_law.beta, 2.0, epsilon = 1e-9);
        let Source::Tabulated(source) = c.source().unwrap() else {
            panic!("wrong source kind");
        };
        assert_eq!(source.abscissas(), &[-1e-6, 0.0, 1e-6]);
        assert_abs_diff_eq!(source.field()[1].re, 1.0);
        assert_abs_diff_eq!(source.field()[0].re, 0.5);
    }
}
