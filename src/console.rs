//! Handling the WISE CLI
//!
//! This module handles the command line parsing as well as basic information (e.g. help dialog, version information, etc.).
use crate::{
    error::{WiseError, WiseResult},
    get_version,
};
use clap::{builder::Str, Parser};
use std::path::{Path, PathBuf};

/// Command line arguments for the WISE application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// file path of the beamline configuration
    pub config_path: PathBuf,
    /// destination directory of the detector profiles
    pub output_directory: PathBuf,
    /// run the best focus sweep of the configuration
    pub best_focus: bool,
    /// number of worker threads, overriding the configuration
    pub workers: Option<usize>,
}

/// Raw command line arguments.
#[derive(Parser, Debug)]
#[command(author, version = Str::from(get_version()), about, long_about = None)]
pub struct PartialArgs {
    /// file path of the beamline configuration (YAML)
    #[arg(short, long)]
    config: String,

    /// destination directory of the results. if not defined, the directory of the configuration file is used
    #[arg(short, long)]
    output_dir: Option<String>,

    /// run the best focus sweep defined in the configuration
    #[arg(short, long)]
    best_focus: bool,

    /// number of worker threads (0 or 1: single threaded). overrides the configuration file
    #[arg(short, long)]
    workers: Option<usize>,
}

/// Checks if the passed file path is an existing file.
fn file_path_is_valid(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// Gets the parent directory of the passed file path. An empty path is returned for a bare file name.
fn get_parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

impl TryFrom<PartialArgs> for Args {
    type Error = WiseError;

    fn try_from(part_args: PartialArgs) -> WiseResult<Self> {
        let config_path = PathBuf::from(&part_args.config);
        if !file_path_is_valid(&config_path) {
            return Err(WiseError::Config(format!(
                "configuration file {} not found",
                config_path.display()
            )));
        }
        let output_directory = match part_args.output_dir {
            Some(dir) if !dir.is_empty() => {
                let dir = PathBuf::from(dir);
                if dir.exists() && !dir.is_dir() {
                    return Err(WiseError::Config(format!(
                        "output path {} is not a directory",
                        dir.display()
                    )));
                }
                dir
            }
            _ => get_parent_dir(&config_path),
        };
        Ok(Self {
            config_path,
            output_directory,
            best_focus: part_args.best_focus,
            workers: part_args.workers,
        })
    }
}

/// Creates the intro text shown at program start.
#[must_use]
pub fn create_intro() -> String {
    format!(
        "{: ^80}\n{: ^80}\n",
        "WISE - Wavefront propagation In Simple Elliptical mirrors",
        format!("version {}", get_version())
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;

    fn partial(config: &str, output_dir: Option<&str>) -> PartialArgs {
        PartialArgs {
            config: config.into(),
            output_dir: output_dir.map(Into::into),
            best_focus: false,
            workers: None,
        }
    }
    #[test]
    fn parse_command_line() {
        let args = PartialArgs::parse_from(["wise", "-c", "beamline.yaml", "--best-focus", "-w", "4"]);
        assert_eq!(args.config, "beamline.yaml");
        assert!(args.best_focus);
        assert_eq!(args.workers, Some(4));
        assert!(args.output_dir.is_none());
        assert!(PartialArgs::try_parse_from(["wise"]).is_err());
    }
    #[test]
    fn args_default_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("beamline.yaml");
        fs::write(&config, "").unwrap();
        let args = Args::try_from(partial(config.to_str().unwrap(), None)).unwrap();
        assert_eq!(args.output_directory, dir.path());
        assert_eq!(args.config_path, config);
        let args = Args::try_from(partial(config.to_str().unwrap(), Some(""))).unwrap();
        assert_eq!(args.output_directory, dir.path());
    }
    #[test]
    fn args_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("beamline.yaml");
        fs::write(&config, "").unwrap();
        let out = dir.path().join("results");
        let args =
            Args::try_from(partial(config.to_str().unwrap(), out.to_str())).unwrap();
        assert_eq!(args.output_directory, out);
        assert_matches!(
            Args::try_from(partial(config.to_str().unwrap(), config.to_str())),
            Err(WiseError::Config(_))
        );
    }
    #[test]
    fn args_missing_config() {
        assert_matches!(
            Args::try_from(partial("./no_such_beamline.yaml", None)),
            Err(WiseError::Config(_))
        );
    }
    #[test]
    fn intro() {
        assert!(create_intro().contains("WISE"));
    }
}
