use chrono::NaiveDate;
use rainmap_shared::models::{
    DistrictWarning, ForecastData, ForecastScope, MapForecast, ObservedData, RealizedMap,
};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

// Every key starts with the ISO date, so key order is date order.
const FORECASTS_TABLE: JsonTable = TableDefinition::new("map_forecasts");
const REALIZED_TABLE: JsonTable = TableDefinition::new("realized_maps");
const WARNINGS_TABLE: JsonTable = TableDefinition::new("district_warnings");

pub struct Storage {
    db: Database,
    path: PathBuf,
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `date|area|horizon|phenomenon`; sorts after the bare date and before `date~`.
fn warning_key(date: NaiveDate, area_id: &str, horizon: u16, phenomenon: &str) -> String {
    format!("{}|{}|{:05}|{}", date_key(date), area_id, horizon, phenomenon)
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, String> {
        let db = Database::create(path)
            .map_err(|e| format!("Failed to open database at {}: {}", path.display(), e))?;

        // Ensure tables exist
        let write_txn = db.begin_write().map_err(|e| e.to_string())?;
        {
            write_txn.open_table(FORECASTS_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(REALIZED_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(WARNINGS_TABLE).map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        Ok(Arc::new(Storage { db, path: path.to_path_buf() }))
    }

    /// Insert or replace the value at `key`, built from the previous value if any.
    ///
    /// Returns the stored value and whether the key was new.
    fn upsert<T, F>(&self, def: JsonTable, key: &str, build: F) -> Result<(T, bool), String>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let (value, created) = {
            let mut table = write_txn.open_table(def).map_err(|e| e.to_string())?;
            let previous: Option<T> = match table.get(key).map_err(|e| e.to_string())? {
                Some(bytes) => {
                    Some(serde_json::from_slice(bytes.value()).map_err(|e| e.to_string())?)
                }
                None => None,
            };
            let created = previous.is_none();
            let value = build(previous);
            let json = serde_json::to_vec(&value).map_err(|e| e.to_string())?;
            table
                .insert(key, json.as_slice())
                .map_err(|e| e.to_string())?;
            (value, created)
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok((value, created))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        key: &str,
    ) -> Result<Option<T>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(def).map_err(|e| e.to_string())?;

        match table.get(key).map_err(|e| e.to_string())? {
            Some(value) => serde_json::from_slice(value.value())
                .map(Some)
                .map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    /// Values whose keys fall in `[first, last]`.
    fn range_json<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        first: &str,
        last: &str,
    ) -> Result<Vec<T>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(def).map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        for entry in table
            .range::<&str>(first..=last)
            .map_err(|e| e.to_string())?
        {
            let (_, value) = entry.map_err(|e| e.to_string())?;
            out.push(serde_json::from_slice(value.value()).map_err(|e| e.to_string())?);
        }
        Ok(out)
    }

    fn remove(&self, def: JsonTable, key: &str) -> Result<bool, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let removed = {
            let mut table = write_txn.open_table(def).map_err(|e| e.to_string())?;
            let result = table.remove(key).map_err(|e| e.to_string())?;
            result.is_some()
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(removed)
    }

    fn count(&self, def: JsonTable) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(def).map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }

    // --- forecast maps ---

    /// Save the forecast for `date`, replacing any earlier one but keeping its creation time.
    pub fn save_forecast(
        &self,
        date: NaiveDate,
        scope: ForecastScope,
        data: ForecastData,
    ) -> Result<(MapForecast, bool), String> {
        let now = chrono::Utc::now().to_rfc3339();
        self.upsert(FORECASTS_TABLE, &date_key(date), |previous: Option<MapForecast>| {
            MapForecast {
                date,
                scope,
                data,
                created_at: previous.map(|p| p.created_at).unwrap_or_else(|| now.clone()),
                updated_at: now,
            }
        })
    }

    pub fn get_forecast(&self, date: NaiveDate) -> Result<Option<MapForecast>, String> {
        self.get_json(FORECASTS_TABLE, &date_key(date))
    }

    pub fn forecasts_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MapForecast>, String> {
        if start > end {
            return Ok(Vec::new());
        }
        self.range_json(FORECASTS_TABLE, &date_key(start), &date_key(end))
    }

    /// Dates that have a saved forecast, newest first.
    pub fn forecast_dates(&self) -> Result<Vec<NaiveDate>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(FORECASTS_TABLE).map_err(|e| e.to_string())?;

        let mut dates = Vec::new();
        for entry in table.iter().map_err(|e| e.to_string())?.rev() {
            let (key, _) = entry.map_err(|e| e.to_string())?;
            match NaiveDate::parse_from_str(key.value(), "%Y-%m-%d") {
                Ok(date) => dates.push(date),
                Err(e) => {
                    tracing::warn!(key = key.value(), error = %e, "Skipping malformed forecast key")
                }
            }
        }
        Ok(dates)
    }

    pub fn delete_forecast(&self, date: NaiveDate) -> Result<bool, String> {
        self.remove(FORECASTS_TABLE, &date_key(date))
    }

    pub fn count_forecasts(&self) -> Result<u64, String> {
        self.count(FORECASTS_TABLE)
    }

    // --- observed rainfall ---

    pub fn save_realized(
        &self,
        date: NaiveDate,
        data: ObservedData,
    ) -> Result<(RealizedMap, bool), String> {
        let now = chrono::Utc::now().to_rfc3339();
        self.upsert(REALIZED_TABLE, &date_key(date), |previous: Option<RealizedMap>| {
            RealizedMap {
                date,
                data,
                created_at: previous.map(|p| p.created_at).unwrap_or_else(|| now.clone()),
                updated_at: now,
            }
        })
    }

    pub fn get_realized(&self, date: NaiveDate) -> Result<Option<RealizedMap>, String> {
        self.get_json(REALIZED_TABLE, &date_key(date))
    }

    pub fn realized_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RealizedMap>, String> {
        if start > end {
            return Ok(Vec::new());
        }
        self.range_json(REALIZED_TABLE, &date_key(start), &date_key(end))
    }

    pub fn count_realized(&self) -> Result<u64, String> {
        self.count(REALIZED_TABLE)
    }

    // --- district warnings ---

    /// Save a warning, replacing the one with the same district, date, horizon
    /// and phenomenon but keeping its creation time.
    pub fn save_warning(
        &self,
        warning: DistrictWarning,
    ) -> Result<(DistrictWarning, bool), String> {
        let key = warning_key(
            warning.date,
            &warning.area_id,
            warning.horizon,
            &warning.phenomenon,
        );
        let now = chrono::Utc::now().to_rfc3339();
        self.upsert(WARNINGS_TABLE, &key, |previous: Option<DistrictWarning>| {
            DistrictWarning {
                created_at: previous.map(|p| p.created_at).unwrap_or_else(|| now.clone()),
                updated_at: now,
                ..warning
            }
        })
    }

    /// Warnings dated within `[start, end]`, by date then district.
    pub fn warnings_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DistrictWarning>, String> {
        if start > end {
            return Ok(Vec::new());
        }
        let last = format!("{}~", date_key(end));
        self.range_json(WARNINGS_TABLE, &date_key(start), &last)
    }

    pub fn delete_warning(
        &self,
        date: NaiveDate,
        area_id: &str,
        horizon: u16,
        phenomenon: &str,
    ) -> Result<bool, String> {
        self.remove(WARNINGS_TABLE, &warning_key(date, area_id, horizon, phenomenon))
    }

    pub fn count_warnings(&self) -> Result<u64, String> {
        self.count(WARNINGS_TABLE)
    }

    pub fn db_size_bytes(&self) -> Result<u64, String> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| e.to_string())
    }
}
