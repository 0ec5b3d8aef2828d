use rainmap_shared::districts::DistrictIndex;
use rainmap_shared::feature::{AreaCatalog, AreaFeature};
use rainmap_shared::models::AreaLevel;
use std::path::Path;

use crate::config::Config;

/// Boundary file and state membership loaded once at startup.
#[derive(Debug, Default)]
pub struct Assets {
    pub catalog: AreaCatalog,
    pub districts: DistrictIndex,
}

impl Assets {
    /// Load both files; a missing or broken file leaves that part empty.
    pub fn load(config: &Config) -> Self {
        let catalog = match read_catalog(&config.geojson_path()) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(error = %e, "No area boundaries loaded");
                AreaCatalog::default()
            }
        };

        let districts = match read_districts(&config.districts_csv_path()) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to state codes in the boundary file");
                DistrictIndex::from_catalog(&catalog)
            }
        };

        tracing::info!(
            districts = catalog.of_level(AreaLevel::District).count(),
            states = catalog.of_level(AreaLevel::State).count(),
            indexed_states = districts.state_count(),
            "Loaded map assets"
        );

        Assets { catalog, districts }
    }

    pub fn find_area(&self, id: &str) -> Option<&AreaFeature> {
        self.catalog.get(id)
    }
}

fn read_catalog(path: &Path) -> Result<AreaCatalog, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    AreaCatalog::from_geojson_str(&text)
        .map_err(|e| format!("Failed to parse {}: {:#}", path.display(), e))
}

fn read_districts(path: &Path) -> Result<DistrictIndex, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    DistrictIndex::from_csv_str(&text)
        .map_err(|e| format!("Failed to parse {}: {:#}", path.display(), e))
}
