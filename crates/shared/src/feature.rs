//! Classification of GeoJSON features into map areas.
//!
//! Boundary files come from several sources, so every lookup tries a list of
//! property names and takes the first non-empty value.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use crate::models::{AreaLevel, AreaRecord};

const DISTRICT_CODE_KEYS: [&str; 4] = ["DIST_ID", "dist_id", "DISTCODE", "distcode"];
const STATE_CODE_KEYS: [&str; 4] = ["STATE_CODE", "state_code", "STATE", "state"];
const STATE_NAME_KEYS: [&str; 2] = ["STATE_NAME", "state_name"];
const NAME_KEYS: [&str; 6] = [
    "DIST_NAME",
    "dist_name",
    "NAME",
    "name",
    "STATE_NAME",
    "state_name",
];
const DISTRICT_MARKER_KEYS: [&str; 4] = ["DIST_ID", "dist_id", "DIST_NAME", "dist_name"];

pub type Properties = Map<String, Value>;

/// A closed ring of `(lon, lat)` points.
pub type Ring = Vec<(f64, f64)>;

/// First non-empty value among `keys`, with numbers stringified.
pub fn first_property(props: &Properties, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match props.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    })
}

/// Whole-valued floats lose their fraction, so `342.0` reads as `342`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

pub fn district_code(props: &Properties) -> Option<String> {
    first_property(props, &DISTRICT_CODE_KEYS)
}

pub fn state_code(props: &Properties) -> Option<String> {
    first_property(props, &STATE_CODE_KEYS)
}

pub fn feature_name(props: &Properties) -> String {
    first_property(props, &NAME_KEYS).unwrap_or_else(|| "Unknown".to_string())
}

pub fn feature_level(props: &Properties) -> AreaLevel {
    if let Some(level) = first_property(props, &["LEVEL", "level"]).and_then(|l| l.parse().ok()) {
        return level;
    }
    if first_property(props, &DISTRICT_MARKER_KEYS).is_some() {
        AreaLevel::District
    } else {
        AreaLevel::State
    }
}

/// Area identifier for a feature: `D_<code>`, `S_<code>` or `UNK_<name|index>`.
pub fn feature_id(props: &Properties, index: usize) -> String {
    let level = feature_level(props);
    let code = match level {
        AreaLevel::District => district_code(props).or_else(|| first_property(props, &["id"])),
        AreaLevel::State => state_code(props).or_else(|| first_property(props, &STATE_NAME_KEYS)),
    };
    match code {
        Some(code) => format!("{}{}", level.prefix(), code),
        None => match first_property(props, &NAME_KEYS) {
            Some(name) => format!("UNK_{}", name),
            None => format!("UNK_{}", index),
        },
    }
}

/// One polygon feature from the boundary file.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaFeature {
    pub id: String,
    pub name: String,
    pub level: AreaLevel,
    /// State the area belongs to, when the file records it.
    pub state_code: Option<String>,
    pub rings: Vec<Ring>,
}

impl AreaFeature {
    pub fn from_value(feature: &Value, index: usize) -> Self {
        let empty = Properties::new();
        let props = feature
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        AreaFeature {
            id: feature_id(props, index),
            name: feature_name(props),
            level: feature_level(props),
            state_code: state_code(props),
            rings: feature.get("geometry").map(parse_rings).unwrap_or_default(),
        }
    }

    pub fn record(&self) -> AreaRecord {
        AreaRecord::new(self.id.clone(), self.name.clone(), self.level)
    }

    /// Even-odd point-in-polygon test over every ring.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.rings
            .iter()
            .filter(|ring| ring_contains(ring, lon, lat))
            .count()
            % 2
            == 1
    }

    /// `(min_lon, min_lat, max_lon, max_lat)`, or `None` without geometry.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of(self.rings.iter().flatten())
    }
}

fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn bounds_of<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<(f64, f64, f64, f64)> {
    points.fold(None, |acc, &(x, y)| match acc {
        None => Some((x, y, x, y)),
        Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
    })
}

fn parse_point(v: &Value) -> Option<(f64, f64)> {
    let arr = v.as_array()?;
    Some((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
}

fn parse_polygon(v: &Value) -> Vec<Ring> {
    v.as_array()
        .map(|rings| {
            rings
                .iter()
                .filter_map(Value::as_array)
                .map(|pts| pts.iter().filter_map(parse_point).collect::<Ring>())
                .filter(|ring| ring.len() >= 3)
                .collect()
        })
        .unwrap_or_default()
}

/// Rings of a Polygon or MultiPolygon geometry; anything else has none.
fn parse_rings(geometry: &Value) -> Vec<Ring> {
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("Polygon") => parse_polygon(coords),
        Some("MultiPolygon") => coords
            .as_array()
            .map(|polys| polys.iter().flat_map(parse_polygon).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Every area in a boundary file, identifiers unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaCatalog {
    pub features: Vec<AreaFeature>,
}

impl AreaCatalog {
    /// Parse a FeatureCollection (or a bare array of features).
    ///
    /// A feature whose identifier was already seen is dropped with a warning.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("Failed to parse GeoJSON")?;
        let features = match &value {
            Value::Array(features) => features,
            Value::Object(obj)
                if obj.get("type").and_then(Value::as_str) == Some("FeatureCollection") =>
            {
                obj.get("features")
                    .and_then(Value::as_array)
                    .context("FeatureCollection has no features array")?
            }
            _ => bail!("GeoJSON is neither a FeatureCollection nor an array of features"),
        };

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(features.len());
        for (index, raw) in features.iter().enumerate() {
            let feature = AreaFeature::from_value(raw, index);
            if !seen.insert(feature.id.clone()) {
                tracing::warn!(
                    id = %feature.id,
                    index,
                    "Duplicate area id, keeping the first feature"
                );
                continue;
            }
            out.push(feature);
        }
        tracing::debug!(areas = out.len(), "Parsed area catalog");
        Ok(AreaCatalog { features: out })
    }

    pub fn records(&self) -> Vec<AreaRecord> {
        self.features.iter().map(AreaFeature::record).collect()
    }

    pub fn get(&self, id: &str) -> Option<&AreaFeature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn of_level(&self, level: AreaLevel) -> impl Iterator<Item = &AreaFeature> {
        self.features.iter().filter(move |f| f.level == level)
    }

    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of(self.features.iter().flat_map(|f| f.rings.iter().flatten()))
    }

    /// Area under a point among `levels`; earlier levels win when areas overlap.
    pub fn hit_test(&self, lon: f64, lat: f64, levels: &[AreaLevel]) -> Option<&AreaFeature> {
        levels
            .iter()
            .find_map(|&level| self.of_level(level).find(|f| f.contains(lon, lat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Properties {
        v.as_object().unwrap().clone()
    }

    fn square(x0: f64, y0: f64, size: f64) -> Value {
        json!([[[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]]])
    }

    #[test]
    fn test_district_id_from_dist_id() {
        let p = props(json!({"DIST_ID": 342, "DIST_NAME": "Bankura", "STATE_CODE": "WB"}));
        assert_eq!(feature_level(&p), AreaLevel::District);
        assert_eq!(feature_id(&p, 0), "D_342");
        assert_eq!(feature_name(&p), "Bankura");
        assert_eq!(state_code(&p).as_deref(), Some("WB"));
    }

    #[test]
    fn test_whole_float_codes_drop_the_fraction() {
        let p = props(json!({"DIST_ID": 342.0, "DIST_NAME": "Bankura"}));
        assert_eq!(feature_id(&p, 0), "D_342");
        let p = props(json!({"DIST_ID": 34.5, "DIST_NAME": "Half"}));
        assert_eq!(feature_id(&p, 0), "D_34.5");
        let p = props(json!({"STATE_CODE": 19}));
        assert_eq!(feature_id(&p, 0), "S_19");
    }

    #[test]
    fn test_district_code_fallback_keys() {
        let p = props(json!({"dist_name": "Purulia", "distcode": "P01"}));
        assert_eq!(feature_id(&p, 0), "D_P01");
    }

    #[test]
    fn test_state_id_from_state_code() {
        let p = props(json!({"STATE_CODE": "OD", "STATE_NAME": "Odisha"}));
        assert_eq!(feature_level(&p), AreaLevel::State);
        assert_eq!(feature_id(&p, 3), "S_OD");
        assert_eq!(feature_name(&p), "Odisha");
    }

    #[test]
    fn test_state_id_falls_back_to_state_name() {
        let p = props(json!({"state_name": "Jharkhand"}));
        assert_eq!(feature_id(&p, 0), "S_Jharkhand");
    }

    #[test]
    fn test_empty_strings_are_skipped() {
        let p = props(json!({"DIST_ID": "", "dist_id": "77", "DIST_NAME": "Nadia"}));
        assert_eq!(feature_id(&p, 0), "D_77");
    }

    #[test]
    fn test_explicit_level_wins() {
        let p = props(json!({"LEVEL": "state", "DIST_NAME": "odd", "STATE": "BR"}));
        assert_eq!(feature_level(&p), AreaLevel::State);
        assert_eq!(feature_id(&p, 0), "S_BR");
    }

    #[test]
    fn test_unclassifiable_feature_ids_are_deterministic() {
        assert_eq!(feature_id(&props(json!({"NAME": "Sundarbans"})), 5), "UNK_Sundarbans");
        assert_eq!(feature_id(&props(json!({})), 5), "UNK_5");
        assert_eq!(feature_name(&props(json!({}))), "Unknown");
    }

    #[test]
    fn test_catalog_from_feature_collection() {
        let gj = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"DIST_ID": 1, "DIST_NAME": "A", "STATE_CODE": "WB"},
                 "geometry": {"type": "Polygon", "coordinates": square(0.0, 0.0, 1.0)}},
                {"type": "Feature", "properties": {"STATE_CODE": "WB", "STATE_NAME": "West Bengal"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [square(0.0, 0.0, 2.0)]}},
            ]
        });
        let catalog = AreaCatalog::from_geojson_str(&gj.to_string()).unwrap();
        assert_eq!(catalog.features.len(), 2);
        assert_eq!(catalog.features[0].id, "D_1");
        assert_eq!(catalog.features[1].id, "S_WB");
        assert_eq!(catalog.features[1].rings.len(), 1);
        assert_eq!(catalog.bounds(), Some((0.0, 0.0, 2.0, 2.0)));
    }

    #[test]
    fn test_catalog_accepts_bare_array() {
        let gj = json!([{"properties": {"STATE": "AS"}, "geometry": null}]);
        let catalog = AreaCatalog::from_geojson_str(&gj.to_string()).unwrap();
        assert_eq!(catalog.features[0].id, "S_AS");
        assert!(catalog.features[0].rings.is_empty());
        assert!(catalog.features[0].bounds().is_none());
    }

    #[test]
    fn test_catalog_drops_duplicate_ids() {
        let gj = json!([
            {"properties": {"DIST_ID": 9, "DIST_NAME": "First"}},
            {"properties": {"DIST_ID": 9, "DIST_NAME": "Second"}},
        ]);
        let catalog = AreaCatalog::from_geojson_str(&gj.to_string()).unwrap();
        assert_eq!(catalog.features.len(), 1);
        assert_eq!(catalog.features[0].name, "First");
    }

    #[test]
    fn test_catalog_rejects_non_geojson() {
        assert!(AreaCatalog::from_geojson_str(r#"{"type":"Point"}"#).is_err());
        assert!(AreaCatalog::from_geojson_str("not json").is_err());
    }

    #[test]
    fn test_contains_respects_holes() {
        let feature = AreaFeature {
            id: "D_1".into(),
            name: "Ring".into(),
            level: AreaLevel::District,
            state_code: None,
            rings: vec![
                vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
                vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)],
            ],
        };
        assert!(feature.contains(1.0, 1.0));
        assert!(!feature.contains(5.0, 5.0));
        assert!(!feature.contains(11.0, 5.0));
    }

    #[test]
    fn test_hit_test_prefers_earlier_level() {
        let gj = json!([
            {"properties": {"STATE_CODE": "WB"}, "geometry": {"type": "Polygon", "coordinates": square(0.0, 0.0, 10.0)}},
            {"properties": {"DIST_ID": 1, "DIST_NAME": "A"}, "geometry": {"type": "Polygon", "coordinates": square(0.0, 0.0, 5.0)}},
        ]);
        let catalog = AreaCatalog::from_geojson_str(&gj.to_string()).unwrap();
        let both = [AreaLevel::District, AreaLevel::State];
        assert_eq!(catalog.hit_test(1.0, 1.0, &both).unwrap().id, "D_1");
        assert_eq!(catalog.hit_test(8.0, 8.0, &both).unwrap().id, "S_WB");
        assert_eq!(catalog.hit_test(1.0, 1.0, &[AreaLevel::State]).unwrap().id, "S_WB");
        assert!(catalog.hit_test(20.0, 20.0, &both).is_none());
    }
}
