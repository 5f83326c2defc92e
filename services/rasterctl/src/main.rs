//! rasterctl
//!
//! Inspect gridded geophysical files through the mapper registry: list the
//! mappers, probe raw metadata, open a file as a normalized dataset and
//! export it to Zarr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mappers::{Dispatcher, MapperConfig, MapperKind, NormalizedDataset, OpenOptions};
use raster_common::{BoundingBox, Geolocation, MetadataMap};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rasterctl")]
#[command(about = "Probe, open and export gridded geophysical files")]
struct Args {
    /// YAML mapper configuration (default: MAPPER_* environment variables)
    #[arg(short, long, env = "MAPPER_CONFIG")]
    config: Option<PathBuf>,

    /// Print results and logs as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered mappers in dispatch order
    Mappers,

    /// Show the raw metadata the backend reports
    Probe { path: PathBuf },

    /// Open a file and describe the normalized dataset
    Open {
        path: PathBuf,

        /// Use only this mapper
        #[arg(short, long)]
        mapper: Option<String>,

        /// 0-based sub-dataset index
        #[arg(short, long)]
        sub_dataset: Option<usize>,
    },

    /// Open a file and write it to a Zarr store
    Export {
        path: PathBuf,
        out: PathBuf,

        #[arg(short, long)]
        mapper: Option<String>,

        #[arg(short, long)]
        sub_dataset: Option<usize>,
    },
}

#[derive(Serialize)]
struct MapperRow {
    name: &'static str,
    kind: MapperKind,
}

#[derive(Serialize)]
struct DatasetSummary<'a> {
    path: &'a Path,
    mapper: &'a str,
    width: usize,
    height: usize,
    bands: Vec<&'a str>,
    geolocation: &'static str,
    bbox: Option<BoundingBox>,
    metadata: &'a MetadataMap,
}

impl<'a> DatasetSummary<'a> {
    fn new(dataset: &'a NormalizedDataset) -> Result<Self> {
        let geolocation = match &dataset.geolocation {
            Geolocation::GeoTransform(_) => "geotransform",
            Geolocation::Lambert(_) => "lambert_conformal_conic",
            Geolocation::Geostationary(_) => "geostationary",
            Geolocation::Grids { .. } => "grids",
            Geolocation::Unreferenced => "unreferenced",
        };
        let bbox = if dataset.geolocation.is_georeferenced() {
            dataset.bounding_box()?
        } else {
            None
        };
        Ok(Self {
            path: &dataset.path,
            mapper: &dataset.mapper,
            width: dataset.width,
            height: dataset.height,
            bands: dataset.band_names(),
            geolocation,
            bbox,
            metadata: &dataset.metadata,
        })
    }

    fn print(&self) {
        println!("{}", self.path.display());
        println!("  mapper:      {}", self.mapper);
        println!("  size:        {} x {}", self.width, self.height);
        println!("  geolocation: {}", self.geolocation);
        if let Some(b) = &self.bbox {
            println!(
                "  bbox:        {:.4}, {:.4}, {:.4}, {:.4}",
                b.min_lon, b.min_lat, b.max_lon, b.max_lat
            );
        }
        println!("  bands:       {}", self.bands.join(", "));
        for (k, v) in self.metadata {
            println!("  {} = {}", k, v);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn options(mapper: Option<String>, sub_dataset: Option<usize>) -> OpenOptions {
    OpenOptions {
        mapper,
        sub_dataset,
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = match &args.config {
        Some(path) => MapperConfig::from_yaml(path)
            .with_context(|| format!("loading mapper config {}", path.display()))?,
        None => MapperConfig::from_env(),
    };
    let dispatcher = Dispatcher::from_config(&config)?;

    match args.command {
        Command::Mappers => {
            let rows: Vec<MapperRow> = dispatcher
                .registry()
                .iter()
                .map(|d| MapperRow {
                    name: d.name,
                    kind: d.kind,
                })
                .collect();
            if args.json {
                print_json(&rows)?;
            } else {
                for row in rows {
                    println!("{:<12} {}", row.name, row.kind);
                }
            }
        }
        Command::Probe { path } => {
            let raw = dispatcher.probe(&path)?;
            if args.json {
                print_json(&raw)?;
            } else {
                println!("{} ({})", raw.path.display(), raw.driver);
                println!(
                    "  raster: {} x {}, {} band(s)",
                    raw.raster.width,
                    raw.raster.height,
                    raw.raster.bands.len()
                );
                for (i, sub) in raw.sub_datasets.iter().enumerate() {
                    println!(
                        "  [{}] {} {:?} {}",
                        i, sub.variable, sub.shape, sub.data_type
                    );
                }
                for (k, v) in &raw.metadata {
                    println!("  {} = {}", k, v);
                }
            }
        }
        Command::Open {
            path,
            mapper,
            sub_dataset,
        } => {
            let dataset = dispatcher.open_with_options(&path, &options(mapper, sub_dataset))?;
            let summary = DatasetSummary::new(&dataset)?;
            if args.json {
                print_json(&summary)?;
            } else {
                summary.print();
            }
        }
        Command::Export {
            path,
            out,
            mapper,
            sub_dataset,
        } => {
            let dataset = dispatcher.open_with_options(&path, &options(mapper, sub_dataset))?;
            let summary = dispatcher.export(&dataset, &out)?;
            info!(out = %summary.path.display(), bands = summary.bands.len(), "Export complete");
            if args.json {
                print_json(&serde_json::json!({
                    "path": summary.path,
                    "bands": summary.bands,
                    "geolocation": summary.geolocation,
                }))?;
            } else {
                println!(
                    "{} -> {} ({} band(s), mapper {})",
                    path.display(),
                    summary.path.display(),
                    summary.bands.len(),
                    dataset.mapper
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_flag_after_subcommand() {
        let args = Args::try_parse_from(["rasterctl", "open", "in.nc", "--json"]).unwrap();
        assert!(args.json);
        assert!(matches!(args.command, Command::Open { .. }));
    }

    #[test]
    fn test_text_output_by_default() {
        let args = Args::try_parse_from(["rasterctl", "mappers"]).unwrap();
        assert!(!args.json);
    }
}
