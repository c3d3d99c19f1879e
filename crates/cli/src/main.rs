//! FuelSight CLI - satellite-enhanced wildfire fuel mapping

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fuelsight_analysis::composite::{load_modis_ndvi, CompositeBand, IndexBands};
use fuelsight_analysis::fuse::{fbfm_hazard, fuse_fuel_risk, risk_breakdown, FuseParams};
use fuelsight_analysis::report::{write_json, FusionReport, SeverityReport, StressReport};
use fuelsight_analysis::resample::{resample_classes, resample_field, GridSpec};
use fuelsight_analysis::severity::{classify_severity, dnbr};
use fuelsight_analysis::stress::{stress_breakdown, stress_products, StressParams};
use fuelsight_analysis::temporal::{
    change_magnitude, temporal_difference, vegetation_loss_mask, LossMaskParams,
};
use fuelsight_analysis::validate::{validate, ValidationParams};
use fuelsight_colormap::{auto_params, render_png, render_severity_png, ColorScheme, ColormapParams};
use fuelsight_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use fuelsight_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fuelsight")]
#[command(author, version, about = "Satellite-enhanced wildfire fuel mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Vegetation stress scoring from a pre-fire composite
    Stress {
        /// Pre-fire Sentinel-2 composite (9 bands)
        composite: PathBuf,
        /// Output directory for the change maps
        #[arg(short, long, default_value = "outputs/change_maps")]
        out_dir: PathBuf,
    },
    /// Burn severity (dNBR) from pre- and post-fire composites
    Severity {
        /// Pre-fire composite
        prefire: PathBuf,
        /// Post-fire composite
        postfire: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "outputs/burn_severity")]
        out_dir: PathBuf,
    },
    /// Resample a raster onto another raster's grid
    Resample {
        /// Input raster
        input: PathBuf,
        /// Raster whose grid to resample onto
        reference: PathBuf,
        /// Output file
        output: PathBuf,
        /// Treat the input as categorical (nearest-neighbor)
        #[arg(long)]
        categorical: bool,
    },
    /// Fuse baseline fuel with stress/change grids into enhanced risk
    Fuse {
        /// LANDFIRE multiband baseline (band 1 FBFM40, band 2 CBD)
        landfire: PathBuf,
        /// Stress score grid (from the stress stage)
        stress: PathBuf,
        /// NDVI deviation grid
        ndvi_change: PathBuf,
        /// NDMI deviation grid
        ndmi_change: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "outputs/enhanced_fuel")]
        out_dir: PathBuf,
    },
    /// Validate predictors against observed burn severity
    Validate {
        /// Baseline predictor grid (e.g. LANDFIRE CBD)
        baseline: PathBuf,
        /// Enhanced predictor grid (fuel risk score)
        enhanced: PathBuf,
        /// Ground-truth dNBR grid
        dnbr: PathBuf,
        /// Optional classified severity grid for stratified means
        #[arg(long)]
        classes: Option<PathBuf>,
        /// Output JSON file
        #[arg(short, long, default_value = "outputs/validation/validation_metrics.json")]
        output: PathBuf,
    },
    /// Render a raster to a PNG image
    Render {
        /// Input raster
        input: PathBuf,
        /// Output PNG
        output: PathBuf,
        /// Color scheme: vegetation, stress, burn, moisture, divergent, grayscale
        #[arg(short, long, default_value = "stress")]
        scheme: String,
        /// Render as classified burn severity (discrete palette)
        #[arg(long)]
        severity: bool,
        /// Explicit minimum for normalization
        #[arg(long)]
        min: Option<f64>,
        /// Explicit maximum for normalization
        #[arg(long)]
        max: Option<f64>,
    },
    /// Run the full pipeline over a conventional directory layout
    Run {
        /// Directory with the input rasters
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// Directory for all outputs
        #[arg(short, long, default_value = "outputs")]
        out_dir: PathBuf,
    },
}

// ─── Pipeline layout ────────────────────────────────────────────────────

/// Where the full pipeline run finds its inputs and puts its outputs.
/// Passed explicitly to every stage; there is no global configuration.
struct PipelineLayout {
    data_dir: PathBuf,
    out_dir: PathBuf,
}

impl PipelineLayout {
    fn new(data_dir: PathBuf, out_dir: PathBuf) -> Self {
        Self { data_dir, out_dir }
    }

    fn prefire_composite(&self) -> PathBuf {
        self.data_dir.join("satellite/prefire_composite.tif")
    }

    fn postfire_composite(&self) -> PathBuf {
        self.data_dir.join("satellite/postfire_composite.tif")
    }

    fn modis_prefire(&self) -> PathBuf {
        self.data_dir.join("satellite/modis_prefire.tif")
    }

    fn modis_postfire(&self) -> PathBuf {
        self.data_dir.join("satellite/modis_postfire.tif")
    }

    fn landfire(&self) -> PathBuf {
        self.data_dir.join("landfire/baseline_multiband.tif")
    }

    fn change_dir(&self) -> PathBuf {
        self.out_dir.join("change_maps")
    }

    fn severity_dir(&self) -> PathBuf {
        self.out_dir.join("burn_severity")
    }

    fn fuel_dir(&self) -> PathBuf {
        self.out_dir.join("enhanced_fuel")
    }

    fn validation_dir(&self) -> PathBuf {
        self.out_dir.join("validation")
    }

    fn maps_dir(&self) -> PathBuf {
        self.out_dir.join("maps")
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_field(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> =
        read_geotiff(path, None).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_band(path: &Path, band: CompositeBand) -> Result<Raster<f64>> {
    read_geotiff(path, Some(band.index()))
        .with_context(|| format!("Failed to read band {} of {}", band.name(), path.display()))
}

fn read_classes(path: &Path) -> Result<Raster<u8>> {
    read_geotiff(path, None).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_field(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn write_classes(raster: &Raster<u8>, path: &Path) -> Result<()> {
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output directory {}", dir.display()))
}

// ─── Stage runners (shared by subcommands and the full run) ─────────────

fn run_stress(composite: &Path, out_dir: &Path) -> Result<()> {
    ensure_dir(out_dir)?;

    let bands = IndexBands::load(composite)
        .with_context(|| format!("Failed to load composite {}", composite.display()))?;
    info!(
        "Composite loaded: {} x {}",
        bands.ndvi.cols(),
        bands.ndvi.rows()
    );

    let start = Instant::now();
    let products = stress_products(&bands.ndvi, &bands.ndmi, &bands.nbr, &StressParams::default())
        .context("Failed to score stress")?;
    let elapsed = start.elapsed();

    write_field(&products.stress, &out_dir.join("stress_score.tif"))?;
    write_field(&products.ndvi_deviation, &out_dir.join("ndvi_change.tif"))?;
    write_field(&products.ndmi_deviation, &out_dir.join("ndmi_change.tif"))?;
    write_field(&products.nbr_deviation, &out_dir.join("nbr_change.tif"))?;

    let breakdown = stress_breakdown(&products.stress);
    let report = StressReport::new(
        &bands.ndvi,
        &bands.nbr,
        &bands.ndmi,
        &products.stress,
        &breakdown,
    );
    write_json(&report, out_dir.join("change_statistics.json"))
        .context("Failed to write stress statistics")?;

    info!(
        "Stress: {:.1}% high, {:.1}% moderate, {:.1}% low",
        breakdown.high_percent, breakdown.moderate_percent, breakdown.low_percent
    );
    done("Stress score", &out_dir.join("stress_score.tif"), elapsed);
    Ok(())
}

fn run_severity(prefire: &Path, postfire: &Path, out_dir: &Path) -> Result<()> {
    ensure_dir(out_dir)?;

    let nbr_pre = read_band(prefire, CompositeBand::Nbr)?;
    let nbr_post = read_band(postfire, CompositeBand::Nbr)?;

    let start = Instant::now();
    let dnbr_grid = dnbr(&nbr_pre, &nbr_post).context("Failed to compute dNBR")?;
    let classes = classify_severity(&dnbr_grid).context("Failed to classify severity")?;
    let elapsed = start.elapsed();

    write_field(&dnbr_grid, &out_dir.join("dnbr.tif"))?;
    write_classes(&classes, &out_dir.join("burn_severity_classified.tif"))?;

    let report = SeverityReport::new(&dnbr_grid, &classes);
    write_json(&report, out_dir.join("burn_statistics.json"))
        .context("Failed to write burn statistics")?;

    info!("Burned at any severity: {:.1}%", report.burned_percent);
    done("Burn severity", &out_dir.join("dnbr.tif"), elapsed);
    Ok(())
}

fn run_fuse(
    landfire: &Path,
    stress_path: &Path,
    ndvi_change: &Path,
    ndmi_change: &Path,
    out_dir: &Path,
) -> Result<()> {
    ensure_dir(out_dir)?;

    let fbfm: Raster<i16> = read_geotiff(landfire, Some(1))
        .with_context(|| format!("Failed to read FBFM40 band of {}", landfire.display()))?;
    let cbd: Raster<f64> = read_geotiff(landfire, Some(2))
        .with_context(|| format!("Failed to read CBD band of {}", landfire.display()))?;

    let stress = read_field(stress_path)?;
    let ndvi_dev = read_field(ndvi_change)?;
    let ndmi_dev = read_field(ndmi_change)?;

    let start = Instant::now();

    // Satellite grids onto the LANDFIRE frame; all are continuous fields.
    let target = GridSpec::from_raster(&cbd);
    let stress_aligned = resample_field(&stress, &target).context("Failed to align stress")?;
    let ndvi_aligned = resample_field(&ndvi_dev, &target).context("Failed to align NDVI change")?;
    let ndmi_aligned = resample_field(&ndmi_dev, &target).context("Failed to align NDMI change")?;

    let fused = fuse_fuel_risk(
        &stress_aligned,
        &ndvi_aligned,
        &ndmi_aligned,
        &cbd,
        &FuseParams::default(),
    )
    .context("Failed to fuse fuel risk")?;
    let hazard = fbfm_hazard(&fbfm);
    let elapsed = start.elapsed();

    write_field(&fused.risk_score, &out_dir.join("fuel_risk_score.tif"))?;
    write_field(&fused.load_factor, &out_dir.join("fuel_load_factor.tif"))?;
    write_field(&fused.enhanced_density, &out_dir.join("enhanced_cbd.tif"))?;
    write_field(&hazard, &out_dir.join("fbfm_hazard.tif"))?;
    // The static CBD is re-emitted single-band so the validation stage can
    // read the baseline predictor without touching the multiband file.
    write_field(&cbd, &out_dir.join("baseline_cbd.tif"))?;

    let breakdown = risk_breakdown(&fused.risk_score);
    let report = FusionReport::new(
        &fused.risk_score,
        &fused.load_factor,
        &cbd,
        &fused.enhanced_density,
        &breakdown,
    );
    write_json(&report, out_dir.join("enhancement_statistics.json"))
        .context("Failed to write enhancement statistics")?;

    info!(
        "Risk: {:.1}% high, {:.1}% moderate, {:.1}% low",
        breakdown.high_percent, breakdown.moderate_percent, breakdown.low_percent
    );
    done("Enhanced fuel", &out_dir.join("fuel_risk_score.tif"), elapsed);
    Ok(())
}

fn run_validate(
    baseline_path: &Path,
    enhanced_path: &Path,
    dnbr_path: &Path,
    classes_path: Option<&Path>,
    output: &Path,
) -> Result<()> {
    if let Some(dir) = output.parent() {
        ensure_dir(dir)?;
    }

    let baseline = read_field(baseline_path)?;
    let enhanced = read_field(enhanced_path)?;
    let truth = read_field(dnbr_path)?;

    // Ground truth and classes come from the satellite grid; align them to
    // the predictors. dNBR is continuous, the class grid categorical.
    let target = GridSpec::from_raster(&baseline);
    let truth_aligned = resample_field(&truth, &target).context("Failed to align dNBR")?;
    let classes_aligned = match classes_path {
        Some(path) => Some(
            resample_classes(&read_classes(path)?, &target)
                .context("Failed to align severity classes")?,
        ),
        None => None,
    };

    let start = Instant::now();
    let report = validate(
        &baseline,
        &enhanced,
        &truth_aligned,
        classes_aligned.as_ref(),
        &ValidationParams::default(),
    )
    .context("Validation failed")?;
    let elapsed = start.elapsed();

    write_json(&report, output).context("Failed to write validation metrics")?;

    println!("Baseline  r² = {:.4} (r = {:+.4}, p = {:.2e})",
        report.baseline.r_squared, report.baseline.pearson_r, report.baseline.p_value);
    println!("Enhanced  r² = {:.4} (r = {:+.4}, p = {:.2e})",
        report.enhanced.r_squared, report.enhanced.pearson_r, report.enhanced.p_value);
    println!(
        "Improvement: {:+.4} absolute, {:+.1}% relative over {} pixels",
        report.absolute_improvement, report.relative_improvement_percent, report.sample_size
    );
    if !report.reliable {
        println!("WARNING: below the valid-pixel floor; treat these numbers as anecdotal");
    }
    done("Validation", output, elapsed);
    Ok(())
}

fn run_render(
    input: &Path,
    output: &Path,
    scheme: &str,
    severity: bool,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<()> {
    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() {
            ensure_dir(dir)?;
        }
    }

    let start = Instant::now();
    if severity {
        let classes = read_classes(input)?;
        render_severity_png(&classes, output).context("Failed to render severity map")?;
    } else {
        let raster = read_field(input)?;
        let scheme = ColorScheme::parse(scheme)
            .ok_or_else(|| anyhow::anyhow!("Unknown color scheme: {}", scheme))?;
        let params = match (min, max) {
            (Some(lo), Some(hi)) => ColormapParams::with_range(scheme, lo, hi),
            _ => auto_params(&raster, scheme),
        };
        render_png(&raster, &params, output).context("Failed to render map")?;
    }
    done("Map", output, start.elapsed());
    Ok(())
}

/// The numbered pipeline: stress → severity → fuse → validate → render.
fn run_pipeline(layout: &PipelineLayout) -> Result<()> {
    info!("FuelSight pipeline starting");

    // 1. Change detection / stress
    run_stress(&layout.prefire_composite(), &layout.change_dir())?;

    // Temporal change from the two composites, plus the MODIS trend when
    // the MODIS pair is present.
    let change_dir = layout.change_dir();
    let ndvi_pre = read_band(&layout.prefire_composite(), CompositeBand::Ndvi)?;
    let ndvi_post = read_band(&layout.postfire_composite(), CompositeBand::Ndvi)?;
    let nbr_pre = read_band(&layout.prefire_composite(), CompositeBand::Nbr)?;
    let nbr_post = read_band(&layout.postfire_composite(), CompositeBand::Nbr)?;

    let ndvi_temporal = temporal_difference(&ndvi_pre, &ndvi_post)?;
    let nbr_temporal = temporal_difference(&nbr_pre, &nbr_post)?;
    let loss_mask = vegetation_loss_mask(&ndvi_temporal, &nbr_temporal, LossMaskParams::default())?;
    let magnitude = change_magnitude(&ndvi_temporal, &nbr_temporal)?;
    write_classes(&loss_mask, &change_dir.join("fuel_increase_areas.tif"))?;
    write_field(&magnitude, &change_dir.join("change_magnitude.tif"))?;

    if layout.modis_prefire().exists() && layout.modis_postfire().exists() {
        let target = GridSpec::from_raster(&ndvi_pre);
        let modis_pre = resample_field(&load_modis_ndvi(layout.modis_prefire())?, &target)?;
        let modis_post = resample_field(&load_modis_ndvi(layout.modis_postfire())?, &target)?;
        let modis_change = temporal_difference(&modis_pre, &modis_post)?;
        write_field(&modis_change, &change_dir.join("modis_ndvi_change.tif"))?;
    } else {
        info!("MODIS pair not found; skipping the MODIS trend layer");
    }

    // 2. Burn severity
    run_severity(
        &layout.prefire_composite(),
        &layout.postfire_composite(),
        &layout.severity_dir(),
    )?;

    // 3. Enhanced fuel
    run_fuse(
        &layout.landfire(),
        &change_dir.join("stress_score.tif"),
        &change_dir.join("ndvi_change.tif"),
        &change_dir.join("ndmi_change.tif"),
        &layout.fuel_dir(),
    )?;

    // 4. Validation: LANDFIRE CBD vs the enhanced risk score
    run_validate(
        &layout.fuel_dir().join("baseline_cbd.tif"),
        &layout.fuel_dir().join("fuel_risk_score.tif"),
        &layout.severity_dir().join("dnbr.tif"),
        Some(&layout.severity_dir().join("burn_severity_classified.tif")),
        &layout.validation_dir().join("validation_metrics.json"),
    )?;

    // 5. Presentation maps
    let maps = layout.maps_dir();
    ensure_dir(&maps)?;
    run_render(
        &change_dir.join("stress_score.tif"),
        &maps.join("stress_score.png"),
        "stress",
        false,
        Some(0.0),
        Some(1.0),
    )?;
    run_render(
        &layout.severity_dir().join("dnbr.tif"),
        &maps.join("dnbr.png"),
        "burn",
        false,
        Some(-0.1),
        Some(1.0),
    )?;
    run_render(
        &layout.severity_dir().join("burn_severity_classified.tif"),
        &maps.join("burn_severity.png"),
        "burn",
        true,
        None,
        None,
    )?;
    run_render(
        &layout.fuel_dir().join("fuel_risk_score.tif"),
        &maps.join("fuel_risk_score.png"),
        "stress",
        false,
        Some(0.0),
        Some(100.0),
    )?;

    info!("FuelSight pipeline complete");
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => {
            let raster = read_field(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
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
            if let Some(std) = stats.std_dev {
                println!("  Std: {:.4}", std);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        Commands::Stress { composite, out_dir } => {
            run_stress(&composite, &out_dir)?;
        }

        Commands::Severity {
            prefire,
            postfire,
            out_dir,
        } => {
            run_severity(&prefire, &postfire, &out_dir)?;
        }

        Commands::Resample {
            input,
            reference,
            output,
            categorical,
        } => {
            let start = Instant::now();
            if categorical {
                let source = read_classes(&input)?;
                let reference_raster = read_field(&reference)?;
                let target = GridSpec::from_raster(&reference_raster);
                let result =
                    resample_classes(&source, &target).context("Failed to resample classes")?;
                write_classes(&result, &output)?;
            } else {
                let source = read_field(&input)?;
                let reference_raster = read_field(&reference)?;
                let target = GridSpec::from_raster(&reference_raster);
                let result = resample_field(&source, &target).context("Failed to resample")?;
                write_field(&result, &output)?;
            }
            done("Resampled raster", &output, start.elapsed());
        }

        Commands::Fuse {
            landfire,
            stress,
            ndvi_change,
            ndmi_change,
            out_dir,
        } => {
            run_fuse(&landfire, &stress, &ndvi_change, &ndmi_change, &out_dir)?;
        }

        Commands::Validate {
            baseline,
            enhanced,
            dnbr,
            classes,
            output,
        } => {
            run_validate(&baseline, &enhanced, &dnbr, classes.as_deref(), &output)?;
        }

        Commands::Render {
            input,
            output,
            scheme,
            severity,
            min,
            max,
        } => {
            run_render(&input, &output, &scheme, severity, min, max)?;
        }

        Commands::Run { data_dir, out_dir } => {
            let layout = PipelineLayout::new(data_dir, out_dir);
            run_pipeline(&layout)?;
        }
    }

    Ok(())
}
