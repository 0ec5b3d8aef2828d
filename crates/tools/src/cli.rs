use std::path::PathBuf;

use chrono::NaiveDate;

pub const DEFAULT_GRAPHQL_URL: &str = "http://localhost:3000/graphql";

/// Offline helpers for the rainfall forecast map
#[derive(clap::Parser, Debug)]
#[command(name = "rainmap-tools", version, about, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Derive the district-to-state CSV from the combined GeoJSON
    DistrictsCsv(DistrictsCsvArgs),

    /// Upload observed rainfall for one date
    ImportRealized(ImportRealizedArgs),

    /// Print verification scores for a date range
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct DistrictsCsvArgs {
    /// Combined district and state GeoJSON
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub geojson: PathBuf,

    /// Output CSV, printed to stdout when omitted
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportRealizedArgs {
    /// CSV with `area_id,rainfall_mm` columns
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub csv: PathBuf,

    /// Observation date, YYYY-MM-DD
    #[arg(long)]
    pub date: NaiveDate,

    /// GraphQL endpoint
    #[arg(long, default_value = DEFAULT_GRAPHQL_URL)]
    pub url: String,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// First forecast date, YYYY-MM-DD
    #[arg(long)]
    pub start: NaiveDate,

    /// Last forecast date, YYYY-MM-DD
    #[arg(long)]
    pub end: NaiveDate,

    /// Rain event threshold in mm, server default when omitted
    #[arg(long)]
    pub threshold: Option<f64>,

    /// GraphQL endpoint
    #[arg(long, default_value = DEFAULT_GRAPHQL_URL)]
    pub url: String,
}
