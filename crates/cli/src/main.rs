//! Jolchobi CLI - rapid flood what-if scenarios over a DEM

mod layers;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jolchobi_algorithms::elevation::normalize_elevation;
use jolchobi_algorithms::flood::{DistanceTransform, FloodMethod};
use jolchobi_algorithms::scenario::{
    run_scenario, ExposureLayers, PointLayer, ScenarioConfig, ScenarioReport,
};
use jolchobi_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use jolchobi_core::{CellValue, Raster};

/// Extra depth when neither the flags nor a config file give one
const DEFAULT_EXTRA_DEPTH: f64 = 1.0;
/// Base-elevation percentile when neither the flags nor a config file give one
const DEFAULT_BASE_PERCENTILE: f64 = 5.0;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "jolchobi")]
#[command(author, version, about = "Rapid flood what-if scenarios over a DEM", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about an elevation raster
    Info {
        /// Input raster file
        input: PathBuf,
        /// Extra missing-value sentinel
        #[arg(long, allow_negative_numbers = true)]
        nodata: Option<f64>,
    },
    /// Simulate a flood and report area and infrastructure exposure
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Input DEM (GeoTIFF)
    input: PathBuf,

    /// Scenario configuration (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flood model: bathtub or drainage-proxy [default: bathtub]
    #[arg(short, long, value_parser = parse_method)]
    method: Option<FloodMethod>,

    /// Water depth above the base elevation in metres [default: 1.0]
    #[arg(short, long)]
    extra_depth: Option<f64>,

    /// River gauge preset instead of --extra-depth
    #[arg(long, value_enum, conflicts_with = "extra_depth")]
    preset: Option<Preset>,

    /// Elevation percentile defining the base ("river") level [default: 5]
    #[arg(long)]
    base_percentile: Option<f64>,

    /// Elevation percentile of the drainage-proxy low cells [default: 10]
    #[arg(long)]
    low_percentile: Option<f64>,

    /// Use the binary drainage surface instead of the distance transform
    #[arg(long)]
    binary_distance: bool,

    /// Latitude for geographic cell sizes [default: grid centre]
    #[arg(long, allow_negative_numbers = true)]
    mid_lat: Option<f64>,

    /// Extra missing-value sentinel of the DEM
    #[arg(long, allow_negative_numbers = true)]
    nodata: Option<f64>,

    /// Roads (GeoJSON lines, WGS84)
    #[arg(long)]
    roads: Option<PathBuf>,

    /// Facility layer (GeoJSON points, WGS84), repeatable
    #[arg(long = "points", value_name = "NAME=FILE", value_parser = parse_layer)]
    points: Vec<(String, PathBuf)>,

    /// Output flood mask (GeoTIFF)
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Output depth grid (GeoTIFF)
    #[arg(long)]
    depth: Option<PathBuf>,

    /// Output report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Water levels tied to river gauge warning thresholds
#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// Warning level +0.5 m
    Warning,
    /// Warning level +1.0 m
    WarningHigh,
    /// Severe flood +1.5 m
    Severe,
    /// Extreme flood +2.0 m
    Extreme,
}

impl Preset {
    fn extra_depth(self) -> f64 {
        match self {
            Preset::Warning => 0.5,
            Preset::WarningHigh => 1.0,
            Preset::Severe => 1.5,
            Preset::Extreme => 2.0,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_method(s: &str) -> std::result::Result<FloodMethod, String> {
    s.parse().map_err(|e: jolchobi_core::Error| e.to_string())
}

fn parse_layer(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, file)) if !name.trim().is_empty() && !file.is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected NAME=FILE, got '{s}'")),
    }
}

/// Read a DEM and turn sentinels and implausible values into NaN
fn read_dem(path: &Path, nodata: Option<f64>) -> Result<Raster<f64>> {
    let pb = spinner("Reading DEM...");
    let mut dem: Raster<f64> = read_geotiff(path).context("Failed to read DEM")?;
    let missing = normalize_elevation(&mut dem, nodata);
    pb.finish_and_clear();
    info!("Input: {} x {} ({} missing cells)", dem.cols(), dem.rows(), missing);
    Ok(dem)
}

fn write_result<T: CellValue>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, &GeoTiffOptions::default())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn build_config(args: &SimulateArgs) -> Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("Invalid scenario config {}", path.display()))?
        }
        None => ScenarioConfig::new(FloodMethod::Bathtub, DEFAULT_EXTRA_DEPTH, DEFAULT_BASE_PERCENTILE),
    };

    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(depth) = args.extra_depth.or(args.preset.map(Preset::extra_depth)) {
        config.extra_depth = depth;
    }
    if let Some(p) = args.base_percentile {
        config.base_percentile = p;
    }
    if let Some(p) = args.low_percentile {
        config.low_percentile = p;
    }
    if args.binary_distance {
        config.distance = DistanceTransform::Binary;
    }
    if args.mid_lat.is_some() {
        config.mid_latitude = args.mid_lat;
    }

    config.validate().context("Invalid scenario configuration")?;
    Ok(config)
}

fn load_layers(args: &SimulateArgs) -> Result<ExposureLayers> {
    let pb = spinner("Loading layers...");
    let roads = match &args.roads {
        Some(path) => layers::load_roads(path)?,
        None => Vec::new(),
    };
    let points = args
        .points
        .iter()
        .map(|(name, path)| Ok(PointLayer::new(name.clone(), layers::load_points(path)?)))
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();
    Ok(ExposureLayers { roads, points })
}

fn print_report(report: &ScenarioReport) {
    println!("Method: {}", report.method);
    println!(
        "Base elevation: {:.2} m (p{}), target level: {:.2} m (+{:.2} m)",
        report.base_elevation, report.base_percentile, report.target_level, report.extra_depth
    );
    println!("Flooded cells: {}", report.flooded_cells);
    println!("Flooded area: {:.3} km²", report.flooded_area_km2);
    println!(
        "Depth: max {:.2} m, mean {:.2} m",
        report.max_depth_m, report.mean_depth_m
    );
    println!("Flooded roads: {:.2} km", report.roads.total_km);
    for (category, km) in &report.roads.by_category {
        println!("  {}: {:.2} km", category, km);
    }
    for layer in &report.facilities {
        println!("{}: {} of {} exposed", layer.layer, layer.exposed, layer.total);
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input, nodata } => {
            let raster = read_dem(&input, nodata)?;
            let (rows, cols) = raster.shape();
            let (px, py) = raster.transform().pixel_size();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Pixel size: {} x {}", px, py);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) => match crs.kind() {
                    Ok(kind) => println!("CRS: {} ({:?})", crs, kind),
                    Err(_) => println!("CRS: {} (unclassified)", crs),
                },
                None => println!("CRS: none"),
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Simulate ─────────────────────────────────────────────────
        Commands::Simulate(args) => {
            let config = build_config(&args)?;
            let dem = read_dem(&args.input, args.nodata)?;
            let layers = load_layers(&args)?;

            let pb = spinner("Simulating flood...");
            let start = Instant::now();
            let output = run_scenario(&dem, &config, &layers).context("Scenario failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            print_report(&output.report);
            println!("  Processing time: {:.2?}", elapsed);

            if let Some(path) = &args.mask {
                write_result(&output.flood.mask, path)?;
                done("Flood mask", path, elapsed);
            }
            if let Some(path) = &args.depth {
                write_result(&output.flood.depth, path)?;
                done("Flood depth", path, elapsed);
            }
            if let Some(path) = &args.report {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), &output.report)
                    .context("Failed to write report")?;
                println!("Report saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
