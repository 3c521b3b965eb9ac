use clap::Parser;
use std::path::PathBuf;
use visited_map_lib::{Bounds, ClusterOptions, Config};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Visited Map - Cluster visited places into zoom-aware map markers
pub struct Settings {
    /// CSV files with visited places (name,longitude,latitude,date,description,image)
    #[clap(short, long = "places", value_name = "FILE")]
    pub place_files: Vec<PathBuf>,

    /// Only show places visited in or after this year (places without a year are always shown)
    #[clap(short = 'y', long)]
    pub min_year: Option<u16>,

    /// Cluster radius in pixels
    #[clap(short, long, default_value = "60.0")]
    pub radius: f64,

    /// Deepest zoom level that still clusters
    #[clap(long, default_value = "16")]
    pub max_zoom: u8,

    /// Visible area as WEST,SOUTH,EAST,NORTH in degrees (west > east crosses the antimeridian)
    #[clap(short, long, value_parser = parse_bounds, default_value = "-180,-90,180,90", allow_hyphen_values = true)]
    pub bounds: Bounds,

    /// Map zoom level
    #[clap(short, long, default_value = "2.0")]
    pub zoom: f64,

    /// Also resolve what clicking each cluster marker would do
    #[clap(short, long, default_value = "false")]
    pub expand: bool,

    /// Pretty-print the JSON output
    #[clap(long, default_value = "false")]
    pub pretty: bool,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Collection configuration derived from the flags
    pub fn config(&self) -> Config {
        Config {
            options: ClusterOptions {
                radius_px: self.radius,
                max_zoom: self.max_zoom,
                ..ClusterOptions::default()
            },
            min_year: self.min_year,
        }
    }
}

/// Parse `WEST,SOUTH,EAST,NORTH`
fn parse_bounds(s: &str) -> Result<Bounds, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("{part:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [west, south, east, north] = values[..] else {
        return Err(format!("expected 4 comma-separated values, got {}", values.len()));
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err("bounds must be finite".to_string());
    }
    if south > north {
        return Err(format!("south ({south}) is above north ({north})"));
    }
    Ok(Bounds::new(west, south, east, north))
}
