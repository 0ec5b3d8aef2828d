use std::collections::BTreeMap;
use std::fs;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::ImportRealizedArgs;
use crate::graphql;

const SAVE_REALIZED: &str = "mutation SaveRealized($date: NaiveDate!, $observations: [ObservationInput!]!) { \
    saveRealizedMap(date: $date, observations: $observations) { date created areas } }";

#[derive(Deserialize)]
struct Row {
    area_id: String,
    rainfall_mm: f64,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Observation {
    area_id: String,
    rainfall_mm: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRealizedData {
    save_realized_map: SaveResult,
}

#[derive(Deserialize)]
struct SaveResult {
    date: String,
    created: bool,
    areas: u64,
}

pub fn run(args: &ImportRealizedArgs) -> Result<()> {
    let text = fs::read_to_string(&args.csv)
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;
    let observations = parse_observations(&text)
        .with_context(|| format!("Failed to parse {}", args.csv.display()))?;
    if observations.is_empty() {
        bail!("{} has no observations", args.csv.display());
    }

    eprintln!(
        "[import-realized] {} observations for {}",
        observations.len(),
        args.date
    );
    let variables = serde_json::json!({ "date": args.date, "observations": observations });
    let data: SaveRealizedData = graphql::post(&args.url, SAVE_REALIZED, variables)?;

    let saved = data.save_realized_map;
    let verb = if saved.created { "created" } else { "replaced" };
    println!("{} observed areas {} for {}", saved.areas, verb, saved.date);
    Ok(())
}

/// Read `area_id,rainfall_mm` rows; a repeated area keeps its last value.
fn parse_observations(text: &str) -> Result<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut by_area = BTreeMap::new();
    for (line, row) in reader.deserialize::<Row>().enumerate() {
        // header is line 1
        let line = line + 2;
        let row = row.with_context(|| format!("Bad row on line {line}"))?;
        if row.area_id.is_empty() {
            bail!("Missing area_id on line {line}");
        }
        if !row.rainfall_mm.is_finite() || row.rainfall_mm < 0.0 {
            bail!(
                "Rainfall for '{}' on line {line} must be a non-negative number of mm",
                row.area_id
            );
        }
        if by_area.insert(row.area_id.clone(), row.rainfall_mm).is_some() {
            eprintln!("Warning: '{}' repeated on line {line}, using the later value", row.area_id);
        }
    }

    Ok(by_area
        .into_iter()
        .map(|(area_id, rainfall_mm)| Observation { area_id, rainfall_mm })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_observations() {
        let csv = "area_id,rainfall_mm\nD_2, 0.0\nD_1,12.5\n";
        let obs = parse_observations(csv).unwrap();
        assert_eq!(
            obs,
            vec![
                Observation { area_id: "D_1".into(), rainfall_mm: 12.5 },
                Observation { area_id: "D_2".into(), rainfall_mm: 0.0 },
            ]
        );
    }

    #[test]
    fn test_repeated_area_keeps_last_value() {
        let csv = "area_id,rainfall_mm\nD_1,1.0\nD_1,4.0\n";
        let obs = parse_observations(csv).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].rainfall_mm, 4.0);
    }

    #[test]
    fn test_negative_rainfall_is_rejected() {
        let csv = "area_id,rainfall_mm\nD_1,-2\n";
        let err = parse_observations(csv).unwrap_err().to_string();
        assert!(err.contains("line 2"), "{err}");
    }

    #[test]
    fn test_non_numeric_rainfall_is_rejected() {
        let csv = "area_id,rainfall_mm\nD_1,heavy\n";
        assert!(parse_observations(csv).is_err());
    }

    #[test]
    fn test_observation_variables_are_camel_case() {
        let obs = Observation { area_id: "S_WB".into(), rainfall_mm: 3.0 };
        assert_eq!(
            serde_json::to_value(&obs).unwrap(),
            serde_json::json!({"areaId": "S_WB", "rainfallMm": 3.0})
        );
    }
}
