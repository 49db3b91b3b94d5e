mod app;
pub use app::App;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use vasex_core::TrialConfig;
use vasex_experiment::{
    build_manifest, read_manifest, sample_manifest, shuffle_trials, trials_from_manifest,
    write_manifest,
};

#[derive(Parser, Debug)]
#[command(name = "vasex", version, about = "Three-line visual analog scale rating trials")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Present trials and record ratings
    Run(RunArgs),
    /// Scan a stimuli directory and write a manifest
    Manifest(ManifestArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trial template as JSON; omitted fields take their defaults
    #[arg(long, env = "VASEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manifest listing one stimulus per trial; without it a single trial runs
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Directory stimulus paths are resolved against
    #[arg(long, default_value = ".")]
    pub stimuli_root: PathBuf,

    #[arg(long, short, default_value = "results.json")]
    pub output: PathBuf,

    /// Replace an existing results file instead of refusing to start
    #[arg(long)]
    pub overwrite: bool,

    #[arg(long, env = "VASEX_FONT", default_value = "assets/DejaVuSans.ttf")]
    pub font: PathBuf,

    /// Present manifest trials in random order
    #[arg(long)]
    pub shuffle: bool,

    /// Open a window instead of going borderless fullscreen
    #[arg(long)]
    pub windowed: bool,
}

#[derive(Args, Debug)]
struct ManifestArgs {
    /// Directory with one subfolder per stimulus category
    #[arg(long, default_value = "stimuli")]
    stimuli: PathBuf,

    /// Image paths are written relative to this directory
    #[arg(long, default_value = ".")]
    base: PathBuf,

    #[arg(long, default_value = "manifest.json")]
    out: PathBuf,

    /// Also write a JS file defining `const manifest`
    #[arg(long)]
    js: Option<PathBuf>,

    /// Keep only a small category-balanced subset
    #[arg(long)]
    sample: bool,

    #[arg(long, default_value_t = 2)]
    per_folder: usize,

    #[arg(long, default_value_t = 10)]
    total: usize,

    /// Draw the sample at random instead of taking the first images
    #[arg(long)]
    random: bool,
}

fn load_template(path: Option<&Path>) -> Result<TrialConfig> {
    let Some(path) = path else {
        return Ok(TrialConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: TrialConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!("Loaded trial template from {}", path.display());
    Ok(config)
}

/// Fails when `path` already exists, unless `overwrite` is set, so one
/// participant's results never replace another's.
fn check_output(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        bail!(
            "{} already exists; choose another --output or pass --overwrite",
            path.display()
        );
    }
    Ok(())
}

/// Writes `contents` to `path`. Without `overwrite` the file must not exist
/// yet.
pub fn write_output(path: &Path, contents: &str, overwrite: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn build_trials(args: &RunArgs) -> Result<Vec<TrialConfig>> {
    let template = load_template(args.config.as_deref())?;
    let Some(manifest) = &args.manifest else {
        return Ok(vec![template]);
    };

    let entries = read_manifest(manifest)
        .with_context(|| format!("failed to load manifest {}", manifest.display()))?;
    if entries.is_empty() {
        bail!("manifest {} lists no stimuli", manifest.display());
    }
    info!("Loaded {} stimuli from {}", entries.len(), manifest.display());

    let mut trials = trials_from_manifest(&entries, &template);
    if args.shuffle {
        shuffle_trials(&mut trials, &mut rand::rng());
    }
    Ok(trials)
}

fn make_manifest(args: ManifestArgs) -> Result<()> {
    let mut entries = build_manifest(&args.stimuli, &args.base)?;
    info!("Found {} images under {}", entries.len(), args.stimuli.display());

    if args.sample {
        entries = if args.random {
            sample_manifest(&entries, args.per_folder, args.total, Some(&mut rand::rng()))
        } else {
            sample_manifest::<rand::rngs::ThreadRng>(&entries, args.per_folder, args.total, None)
        };
        if entries.len() < args.total {
            warn!("Only {} images available for a sample of {}", entries.len(), args.total);
        }
    }

    write_manifest(&entries, &args.out, args.js.as_deref())?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Run(args) => {
            check_output(&args.output, args.overwrite)?;
            let trials = build_trials(&args)?;
            App::new(args, trials)?.run()
        }
        Command::Manifest(args) => make_manifest(args),
    }
}
