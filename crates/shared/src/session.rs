use std::collections::HashMap;

use crate::districts::DistrictIndex;
use crate::models::{
    AreaForecast, AreaLevel, AreaRecord, ForecastData, ForecastScope, RainfallCategory,
    SaveMapRequest,
};

/// Editable forecast for every area on the map plus the current selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSession {
    areas: Vec<AreaRecord>,
    positions: HashMap<String, usize>,
    selected: Vec<String>,
    districts: DistrictIndex,
}

impl ForecastSession {
    /// Areas with an id already seen are dropped, so ids stay unique.
    pub fn new(records: Vec<AreaRecord>, districts: DistrictIndex) -> Self {
        let mut areas = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());
        for record in records {
            if positions.contains_key(&record.id) {
                tracing::warn!(id = %record.id, "Ignoring duplicate area");
                continue;
            }
            positions.insert(record.id.clone(), areas.len());
            areas.push(record);
        }
        ForecastSession {
            areas,
            positions,
            selected: Vec::new(),
            districts,
        }
    }

    pub fn areas(&self) -> &[AreaRecord] {
        &self.areas
    }

    pub fn get(&self, id: &str) -> Option<&AreaRecord> {
        self.positions.get(id).map(|&i| &self.areas[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut AreaRecord> {
        match self.positions.get(id) {
            Some(&i) => Some(&mut self.areas[i]),
            None => None,
        }
    }

    // --- selection ---

    /// Selected ids in the order they were picked.
    pub fn selection(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Flip an area in or out of the selection; returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.positions.contains_key(id) {
            return false;
        }
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(id.to_string());
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn can_apply(&self, category: Option<RainfallCategory>) -> bool {
        category.is_some() && !self.selected.is_empty()
    }

    /// Ids touched by an apply: each selected area, plus member districts of selected states.
    fn expanded_selection(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in &self.selected {
            if AreaLevel::of_id(id) == Some(AreaLevel::State) {
                for district in self.districts.districts_of(id) {
                    if !ids.contains(district) {
                        ids.push(district.clone());
                    }
                }
            }
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Set `category` on the selection, expanding states to their districts.
    ///
    /// Returns how many area records changed. The selection is kept.
    pub fn apply_category(&mut self, category: RainfallCategory) -> usize {
        let mut changed = 0;
        for id in self.expanded_selection() {
            if let Some(rec) = self.get_mut(&id) {
                if rec.category != category {
                    rec.category = category;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Set the measured rainfall on the selection, with the same expansion as categories.
    pub fn apply_rainfall(&mut self, rainfall_mm: Option<f64>) -> usize {
        let mut changed = 0;
        for id in self.expanded_selection() {
            if let Some(rec) = self.get_mut(&id) {
                if rec.rainfall_mm != rainfall_mm {
                    rec.rainfall_mm = rainfall_mm;
                    changed += 1;
                }
            }
        }
        changed
    }

    // --- persistence ---

    /// Copy a saved forecast onto matching areas; returns how many matched.
    pub fn apply_saved(&mut self, data: &ForecastData) -> usize {
        let mut matched = 0;
        for rec in &mut self.areas {
            if let Some(saved) = data.get(&rec.id) {
                rec.category = saved.category;
                if saved.rainfall_mm.is_some() {
                    rec.rainfall_mm = saved.rainfall_mm;
                }
                matched += 1;
            }
        }
        matched
    }

    /// Every area back to DRY with no rainfall.
    pub fn reset(&mut self) {
        for rec in &mut self.areas {
            rec.category = RainfallCategory::Dry;
            rec.rainfall_mm = None;
        }
    }

    pub fn to_forecast_data(&self) -> ForecastData {
        self.areas
            .iter()
            .map(|rec| {
                (
                    rec.id.clone(),
                    AreaForecast {
                        category: rec.category,
                        rainfall_mm: rec.rainfall_mm,
                        name: Some(rec.name.clone()),
                        level: Some(rec.level),
                    },
                )
            })
            .collect()
    }

    pub fn save_request(&self, date: &str, scope: ForecastScope) -> SaveMapRequest {
        SaveMapRequest {
            date: date.to_string(),
            scope,
            data: self.to_forecast_data(),
        }
    }

    /// Number of areas per category, driest first, zero counts included.
    pub fn category_counts(&self) -> [(RainfallCategory, usize); 5] {
        let mut counts = RainfallCategory::ALL.map(|c| (c, 0usize));
        for rec in &self.areas {
            if let Some(entry) = counts.iter_mut().find(|(c, _)| *c == rec.category) {
                entry.1 += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ForecastSession {
        let records = vec![
            AreaRecord::new("D_1", "Bankura", AreaLevel::District),
            AreaRecord::new("D_2", "Purulia", AreaLevel::District),
            AreaRecord::new("D_3", "Puri", AreaLevel::District),
            AreaRecord::new("S_WB", "West Bengal", AreaLevel::State),
            AreaRecord::new("S_OD", "Odisha", AreaLevel::State),
        ];
        let index =
            DistrictIndex::from_csv_str("dist_id,state_code\n1,WB\n2,WB\n3,OD\n99,OD\n").unwrap();
        ForecastSession::new(records, index)
    }

    #[test]
    fn test_new_drops_duplicate_ids() {
        let s = ForecastSession::new(
            vec![
                AreaRecord::new("D_1", "First", AreaLevel::District),
                AreaRecord::new("D_1", "Second", AreaLevel::District),
            ],
            DistrictIndex::default(),
        );
        assert_eq!(s.areas().len(), 1);
        assert_eq!(s.get("D_1").unwrap().name, "First");
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut s = session();
        assert!(s.toggle("D_1"));
        assert!(s.toggle("S_OD"));
        assert_eq!(s.selection(), ["D_1", "S_OD"]);
        assert!(!s.toggle("D_1"));
        assert_eq!(s.selection(), ["S_OD"]);
    }

    #[test]
    fn test_toggle_ignores_unknown_area() {
        let mut s = session();
        assert!(!s.toggle("D_404"));
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_can_apply_needs_category_and_selection() {
        let mut s = session();
        assert!(!s.can_apply(Some(RainfallCategory::Scattered)));
        s.toggle("D_1");
        assert!(!s.can_apply(None));
        assert!(s.can_apply(Some(RainfallCategory::Scattered)));
    }

    #[test]
    fn test_apply_category_to_districts() {
        let mut s = session();
        s.toggle("D_2");
        assert_eq!(s.apply_category(RainfallCategory::Widespread), 1);
        assert_eq!(s.get("D_2").unwrap().category, RainfallCategory::Widespread);
        assert_eq!(s.get("D_1").unwrap().category, RainfallCategory::Dry);
        assert_eq!(s.selection(), ["D_2"], "selection survives an apply");
    }

    #[test]
    fn test_apply_category_expands_state() {
        let mut s = session();
        s.toggle("S_WB");
        assert_eq!(s.apply_category(RainfallCategory::Isolated), 3);
        assert_eq!(s.get("D_1").unwrap().category, RainfallCategory::Isolated);
        assert_eq!(s.get("D_2").unwrap().category, RainfallCategory::Isolated);
        assert_eq!(s.get("S_WB").unwrap().category, RainfallCategory::Isolated);
        assert_eq!(s.get("D_3").unwrap().category, RainfallCategory::Dry);
    }

    #[test]
    fn test_apply_category_skips_unknown_members() {
        let mut s = session();
        s.toggle("S_OD");
        // D_99 is listed for OD but has no polygon
        assert_eq!(s.apply_category(RainfallCategory::Scattered), 2);
        assert_eq!(s.get("D_3").unwrap().category, RainfallCategory::Scattered);
    }

    #[test]
    fn test_apply_category_counts_each_area_once() {
        let mut s = session();
        s.toggle("D_1");
        s.toggle("S_WB");
        assert_eq!(s.apply_category(RainfallCategory::FairlyWidespread), 3);
        assert_eq!(s.apply_category(RainfallCategory::FairlyWidespread), 0);
    }

    #[test]
    fn test_apply_rainfall_expands_state() {
        let mut s = session();
        s.toggle("S_WB");
        assert_eq!(s.apply_rainfall(Some(12.5)), 3);
        assert_eq!(s.get("D_2").unwrap().rainfall_mm, Some(12.5));
        assert_eq!(s.get("D_3").unwrap().rainfall_mm, None);
    }

    #[test]
    fn test_apply_saved_updates_matching_areas() {
        let mut s = session();
        s.toggle("D_3");
        s.apply_rainfall(Some(4.0));

        let saved = |category, rainfall_mm| AreaForecast {
            category,
            rainfall_mm,
            name: None,
            level: None,
        };
        let mut data = ForecastData::new();
        data.insert("D_1".into(), saved(RainfallCategory::Scattered, Some(8.0)));
        data.insert("D_3".into(), saved(RainfallCategory::Widespread, None));
        data.insert("D_404".into(), saved(RainfallCategory::Widespread, None));

        assert_eq!(s.apply_saved(&data), 2);
        assert_eq!(s.get("D_1").unwrap().category, RainfallCategory::Scattered);
        assert_eq!(s.get("D_1").unwrap().rainfall_mm, Some(8.0));
        // a saved entry without rainfall keeps the current value
        assert_eq!(s.get("D_3").unwrap().rainfall_mm, Some(4.0));
        assert_eq!(s.get("D_2").unwrap().category, RainfallCategory::Dry);
    }

    #[test]
    fn test_reset_restores_dry() {
        let mut s = session();
        s.toggle("S_WB");
        s.apply_category(RainfallCategory::Widespread);
        s.apply_rainfall(Some(30.0));
        s.reset();
        assert!(s.areas().iter().all(|a| a.category == RainfallCategory::Dry && a.rainfall_mm.is_none()));
        assert_eq!(s.selection(), ["S_WB"]);
    }

    #[test]
    fn test_save_request_covers_every_area() {
        let mut s = session();
        s.toggle("D_1");
        s.apply_category(RainfallCategory::Scattered);
        let req = s.save_request("2025-07-01", ForecastScope::Mixed);
        assert_eq!(req.date, "2025-07-01");
        assert_eq!(req.data.len(), 5);
        assert_eq!(req.data["D_1"].category, RainfallCategory::Scattered);
        assert_eq!(req.data["S_WB"].level, Some(AreaLevel::State));
        assert_eq!(req.data["D_2"].name.as_deref(), Some("Purulia"));
    }

    #[test]
    fn test_category_counts() {
        let mut s = session();
        s.toggle("S_WB");
        s.apply_category(RainfallCategory::Isolated);
        let counts = s.category_counts();
        assert_eq!(counts[0], (RainfallCategory::Dry, 2));
        assert_eq!(counts[1], (RainfallCategory::Isolated, 3));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 5);
    }
}
