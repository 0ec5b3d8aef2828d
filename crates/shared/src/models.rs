use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rainfall class assigned to an area, driest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RainfallCategory {
    #[default]
    #[serde(rename = "DRY")]
    Dry,
    #[serde(rename = "ISOL")]
    Isolated,
    #[serde(rename = "SCT")]
    Scattered,
    #[serde(rename = "FWS")]
    FairlyWidespread,
    #[serde(rename = "WS")]
    Widespread,
}

impl RainfallCategory {
    pub const ALL: [RainfallCategory; 5] = [
        RainfallCategory::Dry,
        RainfallCategory::Isolated,
        RainfallCategory::Scattered,
        RainfallCategory::FairlyWidespread,
        RainfallCategory::Widespread,
    ];

    pub fn code(self) -> &'static str {
        match self {
            RainfallCategory::Dry => "DRY",
            RainfallCategory::Isolated => "ISOL",
            RainfallCategory::Scattered => "SCT",
            RainfallCategory::FairlyWidespread => "FWS",
            RainfallCategory::Widespread => "WS",
        }
    }

    /// Fill color used on the map and in the legend.
    pub fn color(self) -> &'static str {
        match self {
            RainfallCategory::Dry => "#d3d3d3",
            RainfallCategory::Isolated => "#a4c2f4",
            RainfallCategory::Scattered => "#6fa8dc",
            RainfallCategory::FairlyWidespread => "#3d85c6",
            RainfallCategory::Widespread => "#1c4587",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RainfallCategory::Dry => "Dry",
            RainfallCategory::Isolated => "Isolated",
            RainfallCategory::Scattered => "Scattered",
            RainfallCategory::FairlyWidespread => "Fairly widespread",
            RainfallCategory::Widespread => "Widespread",
        }
    }
}

impl std::fmt::Display for RainfallCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RainfallCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        RainfallCategory::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| format!("Unknown rainfall category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaLevel {
    District,
    State,
}

impl AreaLevel {
    /// Identifier prefix for areas of this level.
    pub fn prefix(self) -> &'static str {
        match self {
            AreaLevel::District => "D_",
            AreaLevel::State => "S_",
        }
    }

    /// Level implied by an area identifier's prefix, if it has one.
    pub fn of_id(id: &str) -> Option<AreaLevel> {
        if id.starts_with(AreaLevel::District.prefix()) {
            Some(AreaLevel::District)
        } else if id.starts_with(AreaLevel::State.prefix()) {
            Some(AreaLevel::State)
        } else {
            None
        }
    }
}

impl std::fmt::Display for AreaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AreaLevel::District => write!(f, "district"),
            AreaLevel::State => write!(f, "state"),
        }
    }
}

impl FromStr for AreaLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "district" => Ok(AreaLevel::District),
            "state" => Ok(AreaLevel::State),
            other => Err(format!("Unknown area level: {}", other)),
        }
    }
}

/// A district or state shown on the map and its current forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub id: String,
    pub name: String,
    pub level: AreaLevel,
    #[serde(default)]
    pub category: RainfallCategory,
    #[serde(default)]
    pub rainfall_mm: Option<f64>,
}

impl AreaRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, level: AreaLevel) -> Self {
        AreaRecord {
            id: id.into(),
            name: name.into(),
            level,
            category: RainfallCategory::Dry,
            rainfall_mm: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastScope {
    District,
    State,
    #[default]
    Mixed,
}

impl std::fmt::Display for ForecastScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastScope::District => write!(f, "district"),
            ForecastScope::State => write!(f, "state"),
            ForecastScope::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for ForecastScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "district" => Ok(ForecastScope::District),
            "state" => Ok(ForecastScope::State),
            "mixed" => Ok(ForecastScope::Mixed),
            other => Err(format!("Unknown forecast scope: {}", other)),
        }
    }
}

/// Forecast stored for one area inside a saved map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaForecast {
    #[serde(default)]
    pub category: RainfallCategory,
    #[serde(default)]
    pub rainfall_mm: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: Option<AreaLevel>,
}

/// Area id -> forecast, ordered by id so serialized maps are stable.
pub type ForecastData = BTreeMap<String, AreaForecast>;

/// Area id -> observed rainfall in mm.
pub type ObservedData = BTreeMap<String, f64>;

/// The forecast for the whole map on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapForecast {
    pub date: NaiveDate,
    #[serde(default)]
    pub scope: ForecastScope,
    pub data: ForecastData,
    pub created_at: String,
    pub updated_at: String,
}

/// Observed rainfall for the whole map on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedMap {
    pub date: NaiveDate,
    pub data: ObservedData,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /forecast/save_map/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMapRequest {
    pub date: String,
    #[serde(default)]
    pub scope: ForecastScope,
    pub data: ForecastData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMapResponse {
    pub ok: bool,
    pub created: bool,
    pub id: String,
    pub date: String,
}

/// Body of `GET /forecast/get_map/`. `scope` and `data` are present only when `found`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMapResponse {
    pub ok: bool,
    pub found: bool,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ForecastScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ForecastData>,
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Rainfall amounts must be finite and non-negative.
pub fn check_rainfall(area_id: &str, mm: f64) -> Result<f64, String> {
    if mm.is_finite() && mm >= 0.0 {
        Ok(mm)
    } else {
        Err(format!(
            "Rainfall for {} must be a non-negative number of mm",
            area_id
        ))
    }
}

fn default_horizon() -> u16 {
    1
}

/// A severe-weather warning issued for one district.
///
/// At most one warning exists per district, date, horizon and phenomenon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictWarning {
    pub area_id: String,
    pub date: NaiveDate,
    /// Lead time in days.
    #[serde(default = "default_horizon")]
    pub horizon: u16,
    /// e.g. "Heavy Rain", "Thunderstorm"
    pub phenomenon: String,
    /// e.g. "Yellow", "Orange", "Red"
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl DistrictWarning {
    /// Build a warning with trimmed text fields; timestamps are set on save.
    pub fn new(
        area_id: &str,
        date: NaiveDate,
        horizon: u16,
        phenomenon: &str,
        severity: Option<&str>,
        description: &str,
    ) -> Result<Self, String> {
        let area_id = area_id.trim();
        if area_id.is_empty() {
            return Err("Warning needs a district".to_string());
        }
        if horizon == 0 {
            return Err("Warning horizon must be at least one day".to_string());
        }
        let phenomenon = phenomenon.trim();
        if phenomenon.is_empty() {
            return Err("Warning phenomenon must not be empty".to_string());
        }
        Ok(DistrictWarning {
            area_id: area_id.to_string(),
            date,
            horizon,
            phenomenon: phenomenon.to_string(),
            severity: severity
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            description: description.trim().to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_rainfall() {
        assert_eq!(check_rainfall("D_1", 0.0), Ok(0.0));
        assert_eq!(check_rainfall("D_1", 12.5), Ok(12.5));
        let err = check_rainfall("D_1", -50.0).unwrap_err();
        assert!(err.contains("D_1"));
        assert!(check_rainfall("D_1", f64::NAN).is_err());
        assert!(check_rainfall("D_1", f64::INFINITY).is_err());
    }

    #[test]
    fn test_warning_new_trims_and_validates() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let w = DistrictWarning::new(" D_1 ", date, 2, " Heavy Rain ", Some(" "), " Stay in ")
            .unwrap();
        assert_eq!(w.area_id, "D_1");
        assert_eq!(w.phenomenon, "Heavy Rain");
        assert_eq!(w.severity, None);
        assert_eq!(w.description, "Stay in");

        assert!(DistrictWarning::new("D_1", date, 0, "Heavy Rain", None, "").is_err());
        assert!(DistrictWarning::new("D_1", date, 1, "  ", None, "").is_err());
        assert!(DistrictWarning::new("", date, 1, "Heavy Rain", None, "").is_err());
    }

    #[test]
    fn test_warning_horizon_defaults_to_one_day() {
        let w: DistrictWarning = serde_json::from_str(
            r#"{"area_id": "D_1", "date": "2025-07-01", "phenomenon": "Heat Wave"}"#,
        )
        .unwrap();
        assert_eq!(w.horizon, 1);
        assert!(w.severity.is_none());
    }

    #[test]
    fn test_category_default_is_dry() {
        assert_eq!(RainfallCategory::default(), RainfallCategory::Dry);
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("sct".parse::<RainfallCategory>(), Ok(RainfallCategory::Scattered));
        assert_eq!(" WS ".parse::<RainfallCategory>(), Ok(RainfallCategory::Widespread));
        assert!("HEAVY".parse::<RainfallCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_as_code() {
        let json = serde_json::to_string(&RainfallCategory::FairlyWidespread).unwrap();
        assert_eq!(json, r#""FWS""#);
        let cat: RainfallCategory = serde_json::from_str(r#""ISOL""#).unwrap();
        assert_eq!(cat, RainfallCategory::Isolated);
    }

    #[test]
    fn test_category_order_is_driest_first() {
        let codes: Vec<&str> = RainfallCategory::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, vec!["DRY", "ISOL", "SCT", "FWS", "WS"]);
        assert!(RainfallCategory::Dry < RainfallCategory::Widespread);
    }

    #[test]
    fn test_level_of_id() {
        assert_eq!(AreaLevel::of_id("D_101"), Some(AreaLevel::District));
        assert_eq!(AreaLevel::of_id("S_WB"), Some(AreaLevel::State));
        assert_eq!(AreaLevel::of_id("UNK_x"), None);
    }

    #[test]
    fn test_area_forecast_defaults_missing_fields() {
        let f: AreaForecast = serde_json::from_str("{}").unwrap();
        assert_eq!(f.category, RainfallCategory::Dry);
        assert!(f.rainfall_mm.is_none());
        assert!(f.level.is_none());
    }

    #[test]
    fn test_save_request_scope_defaults_to_mixed() {
        let req: SaveMapRequest =
            serde_json::from_str(r#"{"date":"2025-07-01","data":{"D_1":{"category":"SCT"}}}"#)
                .unwrap();
        assert_eq!(req.scope, ForecastScope::Mixed);
        assert_eq!(req.data["D_1"].category, RainfallCategory::Scattered);
    }

    #[test]
    fn test_get_map_response_not_found_omits_data() {
        let resp = GetMapResponse {
            ok: true,
            found: false,
            date: "2025-07-01".to_string(),
            scope: None,
            data: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["found"], false);
        assert!(json.get("data").is_none());
        assert!(json.get("scope").is_none());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-07-01"), NaiveDate::from_ymd_opt(2025, 7, 1));
        assert!(parse_date("01/07/2025").is_none());
        assert!(parse_date("2025-02-30").is_none());
    }
}
