use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::feature::AreaCatalog;
use crate::models::AreaLevel;

const STATE_COLUMNS: [&str; 3] = ["state_code", "state", "state_name"];
const DISTRICT_COLUMNS: [&str; 5] = ["dist_id", "distcode", "distcode_id", "geo_id", "id"];

/// State code -> district area ids, used to expand a state selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictIndex {
    by_state: BTreeMap<String, Vec<String>>,
}

impl DistrictIndex {
    /// Build from a CSV with a header row naming a state column and a district column.
    ///
    /// Rows with the wrong number of fields or an empty key are skipped.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read districts CSV header")?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        let column = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| headers.iter().position(|h| h == n))
        };
        let state_col = column(&STATE_COLUMNS).context("Districts CSV has no state column")?;
        let dist_col = column(&DISTRICT_COLUMNS).context("Districts CSV has no district column")?;

        let mut index = DistrictIndex::default();
        let mut skipped = 0usize;
        for record in reader.records() {
            let record = record.context("Failed to read districts CSV row")?;
            if record.len() != headers.len() {
                skipped += 1;
                continue;
            }
            match (record.get(state_col), record.get(dist_col)) {
                (Some(state), Some(dist)) if !state.is_empty() && !dist.is_empty() => {
                    index.insert(state, format!("{}{}", AreaLevel::District.prefix(), dist));
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "Skipped districts CSV rows");
        }
        Ok(index)
    }

    /// Build from the district features that record their state.
    pub fn from_catalog(catalog: &AreaCatalog) -> Self {
        let mut index = DistrictIndex::default();
        for feature in catalog.of_level(AreaLevel::District) {
            if let Some(state) = &feature.state_code {
                index.insert(state, feature.id.clone());
            }
        }
        index
    }

    fn insert(&mut self, state_code: &str, district_id: String) {
        let members = self.by_state.entry(state_code.to_string()).or_default();
        if !members.contains(&district_id) {
            members.push(district_id);
        }
    }

    /// Member districts of a state area id (`S_<code>`) or bare state code.
    pub fn districts_of(&self, state_id: &str) -> &[String] {
        let code = state_id
            .strip_prefix(AreaLevel::State.prefix())
            .unwrap_or(state_id);
        self.by_state.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn state_count(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }
}

/// Write a `dist_id,dist_name,state_code` CSV for every district in the catalog.
pub fn districts_csv(catalog: &AreaCatalog) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["dist_id", "dist_name", "state_code"])?;
    for feature in catalog.of_level(AreaLevel::District) {
        let code = feature
            .id
            .strip_prefix(AreaLevel::District.prefix())
            .unwrap_or(&feature.id);
        writer.write_record([
            code,
            feature.name.as_str(),
            feature.state_code.as_deref().unwrap_or(""),
        ])?;
    }
    let bytes = writer.into_inner().context("Failed to flush districts CSV")?;
    String::from_utf8(bytes).context("Districts CSV is not UTF-8")
}
