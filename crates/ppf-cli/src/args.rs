use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ppf_core::models::GeoLocation;

use crate::cli::{InterventionCommands, PhotoCommands, StepCommands};

/// Field tool for paint-protection-film interventions
///
/// Walks a technician through the inspection, preparation, installation,
/// quality control and finalization steps of an intervention, with draft
/// autosave, photo capture and a completion report. `serve` exposes the same
/// operations as an MCP server and `exec` answers one JSON boundary request.
#[derive(Parser)]
#[command(version, about, name = "ppf")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/ppf/ppf.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// JSON engine configuration (step catalog, thresholds, capture settings)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Technician identity recorded on interventions and approvals
    #[arg(long, global = true, default_value = "technician")]
    pub technician: String,

    /// Treat the device as offline; photo uploads are refused
    #[arg(long, global = true)]
    pub offline: bool,

    /// Position attached to captured photos, as `LAT,LON`
    #[arg(long, global = true, value_parser = parse_location)]
    pub location: Option<GeoLocation>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage interventions
    #[command(alias = "i")]
    Intervention {
        #[command(subcommand)]
        command: InterventionCommands,
    },
    /// Work on the steps of an intervention
    #[command(alias = "s")]
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
    /// Capture and list step photos
    #[command(alias = "p")]
    Photo {
        #[command(subcommand)]
        command: PhotoCommands,
    },
    /// Execute one JSON boundary request and print the JSON response
    Exec {
        /// Request document; read from stdin when omitted
        request: Option<String>,
    },
    /// Start the MCP server
    Serve,
}

fn parse_location(raw: &str) -> Result<GeoLocation, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{raw}'"))?;
    let latitude: f64 = lat.trim().parse().map_err(|e| format!("invalid latitude: {e}"))?;
    let longitude: f64 = lon.trim().parse().map_err(|e| format!("invalid longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("coordinates out of range: {raw}"));
    }
    Ok(GeoLocation {
        latitude,
        longitude,
        accuracy: None,
        altitude: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let location = parse_location("48.8566, 2.3522").unwrap();
        assert_eq!(location.latitude, 48.8566);
        assert_eq!(location.longitude, 2.3522);
        assert!(parse_location("48.8566").is_err());
        assert!(parse_location("95,0").is_err());
    }
}
