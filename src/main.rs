use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use rsfc_hubs::cluster::DetectorKind;
use rsfc_hubs::config::Config;
use rsfc_hubs::data::loaders::load_manifest;
use rsfc_hubs::density::create_density_map;
use rsfc_hubs::pipeline::run_identification;
use rsfc_hubs::profile::create_profiles;
use rsfc_hubs::viz::{OverlayColor, Workbench};

#[derive(Parser, Debug)]
#[clap(
    name = "rsfc-hubs",
    about = "Resting-state cortical hub identification, profiles and density maps"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify hubs for every subject in a manifest
    Identify(IdentifyArgs),

    /// Build hub connectivity profiles and their correlation matrix
    Profiles(ProfilesArgs),

    /// Count hubs per parcel across subjects and render a density map
    Density(DensityArgs),
}

#[derive(Args, Debug)]
struct IdentifyArgs {
    /// Manifest of `<subjectID> <timeseries path>` lines
    manifest: PathBuf,

    /// Output directory (must exist)
    #[clap(long, short)]
    output_dir: PathBuf,

    /// Comma-delimited distance multiplication mask
    #[clap(long, default_value = "COMBINED333_LR_Distance_MULTIPLICATION_MASK.csv")]
    distance_mask: PathBuf,

    /// Parcellation .dlabel.nii template for hub label files
    #[clap(long, default_value = "Parcels_LR.dlabel.nii")]
    parcel_template: PathBuf,

    /// Randomized community detection attempts per threshold
    #[clap(long, short = 'N', default_value = "1000")]
    attempts: u32,

    /// Overlay color for hub parcels
    #[clap(long, value_enum, default_value = "pink")]
    overlay: OverlayColor,

    /// Re-percentiled score at or above which a parcel is a hub
    #[clap(long, default_value = "80")]
    hub_cutoff: f64,

    /// Degree percentile below which parcels are censored
    #[clap(long, default_value = "25")]
    low_degree_percentile: f64,

    /// Community detection backend
    #[clap(long, value_enum, default_value = "infomap")]
    detector: DetectorKind,

    /// Infomap executable
    #[clap(long, default_value = "infomap")]
    infomap: PathBuf,

    /// Connectome Workbench executable
    #[clap(long, default_value = "wb_command")]
    wb_command: PathBuf,

    /// Time limit in seconds for one community detection run
    #[clap(long, default_value = "3600")]
    detector_timeout: u64,

    /// Base seed for reproducible runs (random seeds when omitted)
    #[clap(long)]
    seed: Option<u64>,

    /// Subjects processed concurrently (0 = use all available cores)
    #[clap(long, short, default_value = "1")]
    jobs: usize,

    /// Keep working directories (Pajek, Infomap and PC outputs)
    #[clap(long)]
    keep_intermediate: bool,

    /// Skip stages whose outputs already exist
    #[clap(long)]
    resume: bool,

    /// Do not render hub label files
    #[clap(long)]
    skip_labels: bool,
}

#[derive(Args, Debug)]
struct ProfilesArgs {
    /// Output directory of a finished identification run
    output_dir: PathBuf,

    /// Name for the profile correlation matrix
    #[clap(long, short)]
    name: String,

    /// Subject order for the correlation matrix, one ID per line
    #[clap(long)]
    order_list: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DensityArgs {
    /// Directory of `<subjectID>_HUB_INDICES.txt` files
    indices_dir: PathBuf,

    /// Name for the density map files
    #[clap(long, short)]
    name: String,

    /// Output directory (must exist)
    #[clap(long, short)]
    output_dir: PathBuf,

    /// Gordon 333 .pscalar.nii template
    #[clap(long, default_value = "Gordon333_TEMPLATE.pscalar.nii")]
    template: PathBuf,

    /// Connectome Workbench executable
    #[clap(long, default_value = "wb_command")]
    wb_command: PathBuf,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    match args.command {
        Command::Identify(args) => identify(args),
        Command::Profiles(args) => {
            let out = create_profiles(&args.output_dir, &args.name, args.order_list.as_deref())
                .context("creating hub profiles")?;
            log::info!("Hub profile correlation matrix saved to {}", out.display());
            Ok(())
        }
        Command::Density(args) => {
            let workbench = Workbench::new(args.wb_command, args.template.clone());
            create_density_map(
                &args.indices_dir,
                &args.output_dir,
                &args.name,
                &args.template,
                &workbench,
            )
            .context("creating hub density map")?;
            Ok(())
        }
    }
}

fn identify(args: IdentifyArgs) -> Result<()> {
    let mut config = Config::new(args.output_dir, args.distance_mask, args.parcel_template);
    config.attempts = args.attempts;
    config.overlay = args.overlay;
    config.hub_cutoff = args.hub_cutoff;
    config.low_degree_percentile = args.low_degree_percentile;
    config.detector = args.detector;
    config.infomap_binary = args.infomap;
    config.wb_command = args.wb_command;
    config.detector_timeout = Duration::from_secs(args.detector_timeout);
    config.seed = args.seed;
    config.jobs = args.jobs;
    config.cleanup = !args.keep_intermediate;
    config.resume = args.resume;
    config.skip_labels = args.skip_labels;

    log::info!("Starting hub identification");
    log::info!("Manifest: {}", args.manifest.display());
    log::info!("Output: {}", config.output_dir.display());
    log::info!("Detector: {:?}, {} attempts per threshold", config.detector, config.attempts);

    let subjects = load_manifest(&args.manifest).context("reading subject manifest")?;
    let output_dir = config.output_dir.clone();
    let reports = run_identification(config, &subjects).context("hub identification failed")?;

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    log::info!("Analysis complete. Results saved to {}", output_dir.display());
    if failed > 0 {
        anyhow::bail!("{failed} of {} subjects failed; see run_summary.json", reports.len());
    }
    Ok(())
}
