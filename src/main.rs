use clap::Parser;
use log::info;
use std::{fs, path::Path};
use uom::si::length::meter;
use wise::{
    console::{create_intro, Args, PartialArgs},
    error::{WiseError, WiseResult},
    propagation::{BestFocusSearch, CancellationToken, PropagatorRegistry},
    beamline::{MirrorStage, StageInput},
    BeamlineConfig,
};

fn create_output_dir(path: &Path) -> WiseResult<()> {
    fs::create_dir_all(path).map_err(|e| {
        WiseError::Io(format!(
            "cannot create output directory {} : {}",
            path.display(),
            e
        ))
    })
}

fn run_best_focus(
    config: &BeamlineConfig,
    stage: &MirrorStage,
    workers: usize,
    registry: &PropagatorRegistry,
    output_dir: &Path,
) -> WiseResult<()> {
    let Some(sweep) = config.defocus_sweep()? else {
        return Err(WiseError::Config(
            "no best focus sweep defined in the configuration".into(),
        ));
    };
    let source = config.source_stage()?.placed_for(stage.mirror());
    let template = stage.parameters(&source, config.numerical_integration()?, workers);
    let token = CancellationToken::new();
    let series = BestFocusSearch::new(registry)
        .with_hew_decimals(config.hew_decimals)
        .run(&template, &sweep, &token, |i, step| {
            info!(
                "sweep step {}/{} done (HEW {} m)",
                i + 1,
                sweep.len(),
                step.detector.hew
            );
        })?;
    if let (Some(best), Some(position)) = (series.best(), series.focus_position(stage.mirror().f2())) {
        info!(
            "best focus: defocus {} m (distance to mirror {} m), HEW {} m",
            best.defocus.get::<meter>(),
            position.get::<meter>(),
            best.detector.hew
        );
    }
    if config
        .best_focus
        .as_ref()
        .is_some_and(|b| b.save_partial_results)
    {
        series.save_to_dir(output_dir)?;
        info!("sweep results written to {}", output_dir.display());
    }
    Ok(())
}

fn main() -> WiseResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    //parse CLI arguments
    let args = Args::try_from(PartialArgs::parse())?;
    print!("{}", create_intro());

    //read beamline configuration
    let config = BeamlineConfig::from_file(&args.config_path)?;
    let workers = args.workers.unwrap_or(config.workers);
    let registry = PropagatorRegistry::default();
    let source_stage = config.source_stage()?;
    let mut stage = MirrorStage::new(config.mirror()?).with_defocus(config.defocus);

    create_output_dir(&args.output_directory)?;
    let wavefront = stage.propagate(
        StageInput::Source(&source_stage),
        config.numerical_integration()?,
        workers,
        &registry,
    )?;
    if let Some(detector) = wavefront.detector() {
        info!("HEW at the detector: {} m", detector.hew);
        let header = [
            format!("Defocus: {} [m]", config.defocus.get::<meter>()),
            format!("HEW: {}", detector.hew),
        ];
        let path = args.output_directory.join("detector_profile.dat");
        detector.save_profile(&path, &header)?;
        info!("detector profile written to {}", path.display());
    }
    if args.best_focus {
        run_best_focus(&config, &stage, workers, &registry, &args.output_directory)?;
    }
    Ok(())
}
