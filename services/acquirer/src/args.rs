//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};

use catalog::{GroupingMode, Query};
use sat_common::time::parse_datetime;
use sat_common::{AreaOfInterest, BoundingBox, DataType, TimeRange};

#[derive(Parser, Debug)]
#[command(name = "acquirer")]
#[command(about = "Search satellite catalogs and plan analysis-ready acquisitions")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every registered satellite profile as JSON
    Profiles,
    /// Search the catalog and print matching scenes with the output grid
    Search(SearchArgs),
    /// Validate a YAML save configuration and preview artifact paths
    SaveParams(SaveParamsArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    /// Satellite identifier, e.g. S2MPC
    #[arg(long)]
    pub satellite: String,

    /// Bounding box as minx,miny,maxx,maxy in degrees
    #[arg(long, conflicts_with_all = ["point", "geojson"])]
    pub bbox: Option<String>,

    /// Point as lon,lat, buffered by --buffer degrees
    #[arg(long, conflicts_with = "geojson")]
    pub point: Option<String>,

    /// Half-side of the square around --point, in degrees
    #[arg(long, default_value = "0.005")]
    pub buffer: f64,

    /// GeoJSON file with a Polygon or a Feature wrapping one
    #[arg(long)]
    pub geojson: Option<PathBuf>,

    /// Start date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub end: Option<String>,

    /// Comma separated band names; profile defaults when omitted
    #[arg(long, value_delimiter = ',')]
    pub bands: Option<Vec<String>>,

    /// Maximum scene cloud cover in percent
    #[arg(long)]
    pub cloud_coverage: Option<f64>,

    /// Search by tile id (MGRS for Sentinel-2, PPPRRR for Landsat)
    #[arg(long)]
    pub tile: Option<String>,

    /// Clip to a fixed square of this many pixels instead of the geometry
    #[arg(long)]
    pub window: Option<u32>,

    /// Keep every scene as its own time step
    #[arg(long)]
    pub no_grouping: bool,

    /// Keep provider order instead of sorting by acquisition time
    #[arg(long)]
    pub no_sort: bool,

    /// Cap on returned scenes
    #[arg(long, env = "SAT_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Output dtype override (uint8, uint16, int16, float32)
    #[arg(long)]
    pub dtype: Option<DataType>,

    /// Output fill value override
    #[arg(long, allow_hyphen_values = true)]
    pub fill_value: Option<f64>,
}

#[derive(ClapArgs, Debug)]
pub struct SaveParamsArgs {
    /// YAML file with save parameters
    pub file: PathBuf,

    /// Satellite used for the preview
    #[arg(long, default_value = "S2MPC")]
    pub satellite: String,

    /// Area, field or tile identifier
    #[arg(long, default_value = "area")]
    pub identifier: String,

    /// Acquisition time used for the preview; now when omitted
    #[arg(long)]
    pub date: Option<String>,
}

impl SaveParamsArgs {
    pub fn datetime(&self) -> Result<DateTime<Utc>> {
        match &self.date {
            Some(date) => Ok(parse_datetime(date)?),
            None => Ok(Utc::now()),
        }
    }
}

/// Parse `n` comma separated numbers.
fn parse_numbers(value: &str, n: usize, what: &str) -> Result<Vec<f64>> {
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{} '{}' is not a list of numbers", what, value))?;
    if numbers.len() != n {
        bail!("{} needs {} numbers, got {}", what, n, numbers.len());
    }
    Ok(numbers)
}

impl SearchArgs {
    pub fn area(&self) -> Result<AreaOfInterest> {
        if let Some(bbox) = &self.bbox {
            let v = parse_numbers(bbox, 4, "--bbox")?;
            return Ok(AreaOfInterest::BoundingBox(BoundingBox::new(v[0], v[1], v[2], v[3])));
        }
        if let Some(point) = &self.point {
            let v = parse_numbers(point, 2, "--point")?;
            return Ok(AreaOfInterest::buffered_point(v[0], v[1], self.buffer));
        }
        if let Some(path) = &self.geojson {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not JSON", path.display()))?;
            return Ok(AreaOfInterest::from_geojson(&value)?);
        }
        bail!("one of --bbox, --point or --geojson is required")
    }

    pub fn to_query(&self) -> Result<Query> {
        let mut builder = Query::builder(&self.satellite, self.area()?);

        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                builder = builder.time_range(TimeRange::from_strings(start, end)?);
            }
            (None, None) => {}
            _ => bail!("--start and --end must be given together"),
        }

        if let Some(bands) = &self.bands {
            builder = builder.bands(bands.iter().map(|b| b.trim().to_string()));
        }
        if let Some(cloud) = self.cloud_coverage {
            builder = builder.cloud_coverage(cloud);
        }
        if let Some(tile) = &self.tile {
            builder = builder.tile(tile.as_str());
        }
        if let Some(pixels) = self.window {
            builder = builder.clip_window(pixels);
        }
        if self.no_grouping {
            builder = builder.grouping(GroupingMode::None);
        }
        if let Some(max_items) = self.max_items {
            builder = builder.max_items(max_items);
        }
        if let Some(dtype) = self.dtype {
            builder = builder.dtype(dtype);
        }
        if let Some(fill) = self.fill_value {
            builder = builder.fill_value(fill);
        }

        Ok(builder.sort(!self.no_sort).build()?)
    }
}
