use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub assets_dir: PathBuf,
    pub db_path: PathBuf,
    /// Combined district + state boundaries, relative to `assets_dir`.
    pub geojson_file: PathBuf,
    /// District -> state mapping, relative to `assets_dir`.
    pub districts_csv: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = get("PORT", "3000");
        let port = port
            .parse()
            .with_context(|| format!("PORT is not a valid port number: {}", port))?;

        Ok(Config {
            port,
            assets_dir: PathBuf::from(get("ASSETS_DIR", "assets")),
            db_path: PathBuf::from(get("DB_PATH", "data/forecasts.redb")),
            geojson_file: PathBuf::from(get("GEOJSON_FILE", "geojson/combined_regions.geojson")),
            districts_csv: PathBuf::from(get("DISTRICTS_CSV", "data/districts_from_geojson.csv")),
        })
    }

    pub fn geojson_path(&self) -> PathBuf {
        self.assets_dir.join(&self.geojson_file)
    }

    pub fn districts_csv_path(&self) -> PathBuf {
        self.assets_dir.join(&self.districts_csv)
    }
}
