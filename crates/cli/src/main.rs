//! StreamViz CLI - watershed and gauge selection from the terminal

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_types::Coord;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use streamviz_cloud::blocking::{GeoconnexBlocking, HucResolverBlocking};
use streamviz_cloud::{GeoconnexOptions, Huc10Set, HucResolverOptions, ResolveStrategy};
use streamviz_core::dataset::{output_filename, DatasetOptions};
use streamviz_core::gauge::DEFAULT_PICK_THRESHOLD;
use streamviz_core::geometry::geometry_contains;
use streamviz_core::vector::FeatureCollection;
use streamviz_core::{
    Cardinality, GaugeCatalog, HucCode, HucLevel, SelectionMode, SelectionState,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "streamviz")]
#[command(author, version, about = "Watershed and gauge selection for StreamViz", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test whether a point falls inside the polygons of a GeoJSON file
    Contains {
        /// GeoJSON file (FeatureCollection, Feature or bare geometry)
        #[arg(long)]
        polygon: PathBuf,
        /// Latitude (WGS84)
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude (WGS84)
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// List the HUC10 watersheds of a HUC6 basin
    Huc10 {
        /// HUC6 code
        huc6: String,
        #[command(flatten)]
        service: ServiceArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Gauges inside selected HUC10 watersheds of a HUC6 basin
    GaugesIn {
        /// HUC6 code
        huc6: String,
        /// Gauge GeoJSON file
        #[arg(long)]
        gauges: PathBuf,
        /// HUC10 codes to select (default: every unit of the basin)
        #[arg(long = "huc10")]
        huc10: Vec<String>,
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Pick the gauge nearest to a point
    Nearest {
        /// Gauge GeoJSON file
        #[arg(long)]
        gauges: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Maximum squared distance in degrees²
        #[arg(long, default_value_t = DEFAULT_PICK_THRESHOLD)]
        threshold: f64,
    },
    /// Find the hydrologic unit containing a point (Geoconnex)
    HucLookup {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Level: huc2, huc4, huc6, huc8, huc10, huc12
        #[arg(long, default_value = "huc12")]
        level: String,
        /// Print the HUC12 and every coarser code
        #[arg(long)]
        hierarchy: bool,
    },
    /// Print the downloadable dataset options as JSON
    Datasets,
    /// Output file name for a gauge and dataset label
    Filename {
        /// Gauge stream id
        gauge: String,
        /// Dataset or variable label
        label: String,
    },
}

#[derive(clap::Args)]
struct ServiceArgs {
    /// MapServer/FeatureServer root URL (default: USGS WBD)
    #[arg(long = "service")]
    url: Option<String>,
    /// HUC6 layer id
    #[arg(long)]
    huc6_layer: Option<u32>,
    /// HUC10 layer id
    #[arg(long)]
    huc10_layer: Option<u32>,
}

impl ServiceArgs {
    fn options(&self) -> HucResolverOptions {
        let mut opts = HucResolverOptions::default();
        if let Some(url) = &self.url {
            opts.service_url = url.clone();
        }
        if let Some(layer) = self.huc6_layer {
            opts.huc6_layer = layer;
        }
        if let Some(layer) = self.huc10_layer {
            opts.huc10_layer = layer;
        }
        opts
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
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

fn read_gauges(path: &Path) -> Result<GaugeCatalog> {
    let catalog = GaugeCatalog::from_path(path)
        .with_context(|| format!("Failed to read gauges from {}", path.display()))?;
    info!("Loaded {} gauges", catalog.len());
    Ok(catalog)
}

fn resolve(huc6: &str, service: &ServiceArgs) -> Result<std::sync::Arc<Huc10Set>> {
    let resolver = HucResolverBlocking::new(service.options()).context("Failed to create resolver")?;
    let pb = spinner(&format!("Resolving HUC10 units of {huc6}..."));
    let start = Instant::now();
    let result = resolver.resolve(huc6);
    pb.finish_and_clear();
    let set = result.with_context(|| format!("Failed to resolve HUC6 {huc6}"))?;
    info!("Resolved {} units in {:.2?}", set.len(), start.elapsed());
    Ok(set)
}

fn geo_point(lat: f64, lon: f64) -> Coord<f64> {
    Coord { x: lon, y: lat }
}

fn strategy_label(strategy: &ResolveStrategy) -> String {
    match strategy {
        ResolveStrategy::AttributeField(field) => format!("attribute field '{field}'"),
        ResolveStrategy::SpatialIntersect => "spatial intersection".to_string(),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Geometry ─────────────────────────────────────────────────
        Commands::Contains { polygon, lat, lon } => {
            let text = std::fs::read_to_string(&polygon)
                .with_context(|| format!("Failed to read {}", polygon.display()))?;
            let fc = FeatureCollection::from_geojson_str(&text).context("Invalid GeoJSON")?;
            let point = geo_point(lat, lon);

            let mut inside = 0;
            for (i, feature) in fc.iter().enumerate() {
                let hit = feature
                    .geometry
                    .as_ref()
                    .is_some_and(|g| geometry_contains(g, point));
                let id = feature.id.clone().unwrap_or_else(|| format!("#{i}"));
                println!("{id}: {}", if hit { "inside" } else { "outside" });
                inside += usize::from(hit);
            }
            println!("Point ({lat}, {lon}) is inside {inside} of {} features", fc.len());
        }

        // ── Watersheds ───────────────────────────────────────────────
        Commands::Huc10 { huc6, service, json } => {
            let set = resolve(&huc6, &service)?;
            if json {
                let units: Vec<_> = set
                    .units
                    .iter()
                    .map(|u| serde_json::json!({ "huc10": u.code, "name": u.name }))
                    .collect();
                let out = serde_json::json!({
                    "huc6": set.huc6,
                    "strategy": strategy_label(&set.strategy),
                    "units": units,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("HUC6 {} ({} units, {})", set.huc6, set.len(), strategy_label(&set.strategy));
                for unit in &set.units {
                    println!("  {}  {}", unit.code, unit.name.as_deref().unwrap_or("-"));
                }
            }
        }

        Commands::GaugesIn {
            huc6,
            gauges,
            huc10,
            service,
        } => {
            let catalog = read_gauges(&gauges)?;
            let set = resolve(&huc6, &service)?;

            let mut selection = SelectionState::new(SelectionMode::Domain, Cardinality::Multiple);
            let wanted: Vec<HucCode> = if huc10.is_empty() {
                set.codes().cloned().collect()
            } else {
                huc10
                    .iter()
                    .map(|raw| HucCode::parse(raw, HucLevel::Huc10))
                    .collect::<Result<_, _>>()?
            };
            for code in &wanted {
                let code = code.as_str();
                let unit = set.get(code).with_context(|| {
                    format!("{code} is not a HUC10 unit of {}", set.huc6)
                })?;
                if unit.geometry.is_none() {
                    warn!("{code} has no boundary, skipping");
                    continue;
                }
                selection.toggle_domain(code)?;
            }

            let found = selection.gauges_in_selected_domains(&catalog, set.domains());
            println!("Selected: {}", selection.label());
            println!("{} gauges", found.len());
            for gauge in &found {
                println!("  {}  ({:.5}, {:.5})", gauge.stream_id, gauge.latitude, gauge.longitude);
            }
            info!("Download targets: {}", selection.download_targets(&found).join(","));
        }

        // ── Gauges ───────────────────────────────────────────────────
        Commands::Nearest {
            gauges,
            lat,
            lon,
            threshold,
        } => {
            let catalog = read_gauges(&gauges)?;
            match catalog.nearest_within(lat, lon, threshold) {
                Some(gauge) => println!("{}", gauge.summary()),
                None => println!("No gauge within {threshold} deg² of ({lat}, {lon})"),
            }
        }

        Commands::HucLookup {
            lat,
            lon,
            level,
            hierarchy,
        } => {
            let level: HucLevel = level.parse()?;
            let client = GeoconnexBlocking::new(GeoconnexOptions::default())
                .context("Failed to create Geoconnex client")?;
            let pb = spinner("Querying Geoconnex...");
            let result = if hierarchy {
                client.huc_hierarchy(lat, lon)
            } else {
                client.huc_for_point(lat, lon, level).map(|code| vec![code])
            };
            pb.finish_and_clear();
            for code in result.context("HUC lookup failed")? {
                println!("{}: {}", code.level(), code);
            }
        }

        // ── Datasets ─────────────────────────────────────────────────
        Commands::Datasets => {
            println!("{}", serde_json::to_string_pretty(&DatasetOptions::catalogue())?);
        }

        Commands::Filename { gauge, label } => {
            println!("{}", output_filename(&gauge, &label));
        }
    }

    Ok(())
}
