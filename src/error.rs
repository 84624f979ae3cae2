#![warn(missing_docs)]
//! WISE specific error structures
use std::{error::Error, fmt::Display};

/// WISE application specific Result type
pub type WiseResult<T> = std::result::Result<T, WiseError>;

/// Errors that can be returned by various WISE functions.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum WiseError {
    /// invalid or inconsistent input parameters (lengths, angles, sampling, defocus, ...)
    Configuration(String),
    /// non-finite values during the evaluation of the diffraction integral. This is a special
    /// case of [`WiseError::Configuration`] usually caused by an excessive angular spread between the
    /// incidence and the exit leg.
    IntegrationInstability(String),
    /// a propagation was requested without a required upstream stage (source, optical element, wavefront)
    MissingInput(String),
    /// the requested configuration is valid but not (yet) supported
    UnsupportedConfiguration(String),
    /// errors while reading or writing data files
    Io(String),
    /// errors while reading or writing a beamline configuration document
    Config(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl WiseError {
    /// Returns `true` if this error is a (possibly numerical) configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::IntegrationInstability(_))
    }
    /// Create the standard [`WiseError::IntegrationInstability`] error.
    #[must_use]
    pub fn integration_instability() -> Self {
        Self::IntegrationInstability(
            "Inconsistent source parameters. Maybe \u{0394}Theta is too big.".into(),
        )
    }
}

impl Display for WiseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(m) => write!(f, "Configuration:{m}"),
            Self::IntegrationInstability(m) => write!(f, "Configuration:IntegrationInstability:{m}"),
            Self::MissingInput(m) => write!(f, "MissingInput:{m}"),
            Self::UnsupportedConfiguration(m) => write!(f, "UnsupportedConfiguration:{m}"),
            Self::Io(m) => write!(f, "Io:{m}"),
            Self::Config(m) => write!(f, "Config:{m}"),
            Self::Other(m) => write!(f, "Wise Error:Other:{m}"),
        }
    }
}
impl Error for WiseError {}

impl std::convert::From<String> for WiseError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn from() {
        let error = WiseError::from("test".to_string());
        assert_eq!(error, WiseError::Other("test".to_string()));
    }
    #[test]
    fn configuration_kind() {
        assert!(WiseError::Configuration("x".into()).is_configuration());
        assert!(WiseError::integration_instability().is_configuration());
        assert!(!WiseError::MissingInput("x".into()).is_configuration());
        assert!(!WiseError::UnsupportedConfiguration("x".into()).is_configuration());
    }
    #[test]
    fn display() {
        assert_eq!(
            format!("{}", WiseError::Configuration("test".to_string())),
            "Configuration:test"
        );
        assert_eq!(
            format!("{}", WiseError::integration_instability()),
            "Configuration:IntegrationInstability:Inconsistent source parameters. Maybe \u{0394}Theta is too big."
        );
        assert_eq!(
            format!("{}", WiseError::MissingInput("test".to_string())),
            "MissingInput:test"
        );
        assert_eq!(
            format!("{}", WiseError::UnsupportedConfiguration("test".to_string())),
            "UnsupportedConfiguration:test"
        );
        assert_eq!(format!("{}", WiseError::Io("test".to_string())), "Io:test");
        assert_eq!(
            format!("{}", WiseError::Config("test".to_string())),
            "Config:test"
        );
        assert_eq!(
            format!("{}", WiseError::Other("test".to_string())),
            "Wise Error:Other:test"
        );
    }
    #[test]
    fn debug() {
        assert_eq!(
            format!("{:?}", WiseError::Configuration("test".to_string())),
            "Configuration(\"test\")"
        );
    }
}
