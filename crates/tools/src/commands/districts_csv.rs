use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rainmap_shared::districts::districts_csv;
use rainmap_shared::feature::AreaCatalog;

use crate::cli::DistrictsCsvArgs;

pub fn run(args: &DistrictsCsvArgs) -> Result<()> {
    let csv = build_csv(&args.geojson)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &csv).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("[districts-csv] wrote {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn build_csv(geojson: &Path) -> Result<String> {
    let text = fs::read_to_string(geojson)
        .with_context(|| format!("Failed to read {}", geojson.display()))?;
    let catalog = AreaCatalog::from_geojson_str(&text)
        .with_context(|| format!("Failed to parse {}", geojson.display()))?;
    eprintln!("[districts-csv] {} areas loaded", catalog.features.len());
    districts_csv(&catalog)
}
