//! Binary entrypoint for the wallpaper rotator.

use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

use wallpaper_rotator::config::Configuration;
use wallpaper_rotator::error_log::ErrorLog;
use wallpaper_rotator::permutation::RngPicker;
use wallpaper_rotator::presenter::{CommandPresenter, LogPresenter, Presenter};
use wallpaper_rotator::rotation::{MonotonicClock, Rotation, RotationSettings};
use wallpaper_rotator::scan::DirectoryLister;
use wallpaper_rotator::state::StateFile;

#[derive(Debug, Parser)]
#[command(
    name = "wallpaper-rotator",
    about = "Rotate the desktop wallpaper through a shuffled directory of images"
)]
struct Cli {
    /// Seconds between wallpaper changes [default: 60]
    #[arg(value_name = "INTERVAL_SECONDS")]
    interval: Option<u64>,

    /// Directory searched for wallpapers [default: .]
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the rotation state file
    #[arg(long, value_name = "FILE")]
    state_file: Option<PathBuf>,

    /// Override the error log file
    #[arg(long, value_name = "FILE")]
    error_log: Option<PathBuf>,

    /// Seed the shuffle for reproducible orderings
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Log wallpaper changes instead of applying them
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("wallpaper_rotator={level}")
            .parse()
            .context("building log filter")?,
    );
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            let error_log = ErrorLog::new(Configuration::default().error_log);
            fail(&error_log, &anyhow::Error::new(err).context("parsing command line"));
        }
    };
    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("failed to initialise logging: {err:#}");
    }

    let mut error_log = ErrorLog::new(
        cli.error_log
            .clone()
            .unwrap_or_else(|| Configuration::default().error_log),
    );
    match try_main(&cli, &mut error_log) {
        Ok(never) => match never {},
        Err(err) => fail(&error_log, &err),
    }
}

/// Record a fatal error and exit with status 1.
fn fail(error_log: &ErrorLog, err: &anyhow::Error) -> ! {
    error!(error = ?err, "wallpaper-rotator exited with error");
    if let Err(log_err) = error_log.append(format_args!("{err:#}")) {
        error!(
            path = %error_log.path().display(),
            error = %log_err,
            "failed to append to error log"
        );
    }
    std::process::exit(1);
}

fn try_main(cli: &Cli, error_log: &mut ErrorLog) -> Result<Infallible> {
    let cfg = load_configuration(cli)?;
    *error_log = ErrorLog::new(&cfg.error_log);

    info!(
        root = %cfg.wallpaper_root.display(),
        interval = %humantime::format_duration(cfg.interval),
        state = %cfg.state_file.display(),
        "starting wallpaper-rotator"
    );

    let presenter: Box<dyn Presenter> = if cli.dry_run {
        Box::new(LogPresenter)
    } else {
        Box::new(CommandPresenter::from_config(&cfg.presenter)?)
    };
    let picker = cfg
        .shuffle_seed
        .map_or_else(RngPicker::from_os_rng, RngPicker::seeded);

    let mut rotation = Rotation::start(
        DirectoryLister,
        presenter,
        picker,
        MonotonicClock,
        StateFile::new(&cfg.state_file),
        RotationSettings::from(&cfg),
    )
    .with_context(|| format!("starting rotation in {}", cfg.wallpaper_root.display()))?;

    Ok(rotation.run()?)
}

fn load_configuration(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)?,
        None => Configuration::default(),
    };
    if let Some(secs) = cli.interval {
        cfg.interval = Duration::from_secs(secs);
    }
    if let Some(root) = &cli.root {
        cfg.wallpaper_root = root.clone();
    }
    if let Some(path) = &cli.state_file {
        cfg.state_file = path.clone();
    }
    if let Some(path) = &cli.error_log {
        cfg.error_log = path.clone();
    }
    if cli.seed.is_some() {
        cfg.shuffle_seed = cli.seed;
    }
    cfg.validated().context("validating configuration")
}
