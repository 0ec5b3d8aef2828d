//! Forecast verification against observed rainfall.
//!
//! Categorical scores use a yes/no rain event: rainfall at or above the
//! threshold counts as an event.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{MapForecast, RealizedMap};

/// Rain event threshold in mm.
pub const DEFAULT_THRESHOLD_MM: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Mean absolute error in mm.
    #[serde(rename = "MAE")]
    Mae,
    /// Probability of detection.
    #[serde(rename = "POD")]
    Pod,
    /// False alarm ratio.
    #[serde(rename = "FAR")]
    Far,
    /// Critical success index.
    #[serde(rename = "CSI")]
    Csi,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Mae => write!(f, "MAE"),
            Metric::Pod => write!(f, "POD"),
            Metric::Far => write!(f, "FAR"),
            Metric::Csi => write!(f, "CSI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationScore {
    /// Period end date the score refers to.
    pub date: NaiveDate,
    pub metric: Metric,
    /// `None` for the regional aggregate.
    pub area_id: Option<String>,
    pub value: f64,
    /// Number of forecast/observation pairs behind the score.
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    abs_error_sum: f64,
    samples: usize,
    hits: usize,
    false_alarms: usize,
    misses: usize,
}

impl Tally {
    fn add(&mut self, forecast: f64, observed: f64, threshold: f64) {
        self.abs_error_sum += (forecast - observed).abs();
        self.samples += 1;
        match (forecast >= threshold, observed >= threshold) {
            (true, true) => self.hits += 1,
            (true, false) => self.false_alarms += 1,
            (false, true) => self.misses += 1,
            (false, false) => {}
        }
    }

    fn ratio(num: usize, den: usize) -> Option<f64> {
        (den > 0).then(|| num as f64 / den as f64)
    }

    fn scores(&self) -> Vec<(Metric, f64)> {
        let (h, f, m) = (self.hits, self.false_alarms, self.misses);
        [
            (Metric::Mae, (self.samples > 0).then(|| self.abs_error_sum / self.samples as f64)),
            (Metric::Pod, Self::ratio(h, h + m)),
            (Metric::Far, Self::ratio(f, h + f)),
            (Metric::Csi, Self::ratio(h, h + f + m)),
        ]
        .into_iter()
        .filter_map(|(metric, value)| value.map(|v| (metric, v)))
        .collect()
    }
}

/// Score every area that has forecast/observation pairs in `[start, end]`.
///
/// Missing forecast rainfall counts as 0 mm. Per-area scores come first,
/// ordered by area id, followed by the regional aggregate.
pub fn compute_scores(
    forecasts: &[MapForecast],
    observations: &[RealizedMap],
    start: NaiveDate,
    end: NaiveDate,
    threshold: f64,
) -> Vec<VerificationScore> {
    let observed_by_date: BTreeMap<NaiveDate, &RealizedMap> = observations
        .iter()
        .filter(|o| o.date >= start && o.date <= end)
        .map(|o| (o.date, o))
        .collect();

    let mut per_area: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut regional = Tally::default();
    for forecast in forecasts.iter().filter(|f| f.date >= start && f.date <= end) {
        let Some(observed) = observed_by_date.get(&forecast.date) else {
            continue;
        };
        for (area_id, area) in &forecast.data {
            let Some(&obs) = observed.data.get(area_id) else {
                continue;
            };
            let fc = area.rainfall_mm.unwrap_or(0.0);
            per_area.entry(area_id.as_str()).or_default().add(fc, obs, threshold);
            regional.add(fc, obs, threshold);
        }
    }

    let mut out = Vec::new();
    for (area_id, tally) in &per_area {
        out.extend(tally.scores().into_iter().map(|(metric, value)| VerificationScore {
            date: end,
            metric,
            area_id: Some(area_id.to_string()),
            value,
            samples: tally.samples,
        }));
    }
    out.extend(regional.scores().into_iter().map(|(metric, value)| VerificationScore {
        date: end,
        metric,
        area_id: None,
        value,
        samples: regional.samples,
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaForecast, ForecastData, ForecastScope, ObservedData, RainfallCategory};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn forecast(d: u32, values: &[(&str, Option<f64>)]) -> MapForecast {
        let data: ForecastData = values
            .iter()
            .map(|(id, mm)| {
                (
                    id.to_string(),
                    AreaForecast {
                        category: RainfallCategory::Dry,
                        rainfall_mm: *mm,
                        name: None,
                        level: None,
                    },
                )
            })
            .collect();
        MapForecast {
            date: day(d),
            scope: ForecastScope::Mixed,
            data,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn observed(d: u32, values: &[(&str, f64)]) -> RealizedMap {
        let data: ObservedData = values.iter().map(|(id, mm)| (id.to_string(), *mm)).collect();
        RealizedMap {
            date: day(d),
            data,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn score(scores: &[VerificationScore], area: Option<&str>, metric: Metric) -> Option<f64> {
        scores
            .iter()
            .find(|s| s.area_id.as_deref() == area && s.metric == metric)
            .map(|s| s.value)
    }

    #[test]
    fn test_contingency_scores_for_one_area() {
        // hit, false alarm, miss, correct negative
        let forecasts = vec![
            forecast(1, &[("D_1", Some(10.0))]),
            forecast(2, &[("D_1", Some(5.0))]),
            forecast(3, &[("D_1", Some(0.0))]),
            forecast(4, &[("D_1", None)]),
        ];
        let observations = vec![
            observed(1, &[("D_1", 6.0)]),
            observed(2, &[("D_1", 0.0)]),
            observed(3, &[("D_1", 4.0)]),
            observed(4, &[("D_1", 1.0)]),
        ];
        let scores = compute_scores(&forecasts, &observations, day(1), day(4), DEFAULT_THRESHOLD_MM);

        let mae = score(&scores, Some("D_1"), Metric::Mae).unwrap();
        assert!((mae - (4.0 + 5.0 + 4.0 + 1.0) / 4.0).abs() < 1e-9);
        assert_eq!(score(&scores, Some("D_1"), Metric::Pod), Some(0.5));
        assert_eq!(score(&scores, Some("D_1"), Metric::Far), Some(0.5));
        assert!((score(&scores, Some("D_1"), Metric::Csi).unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert!(scores.iter().all(|s| s.date == day(4)));
    }

    #[test]
    fn test_undefined_ratios_are_omitted() {
        let forecasts = vec![forecast(1, &[("D_1", Some(0.0))])];
        let observations = vec![observed(1, &[("D_1", 0.0)])];
        let scores = compute_scores(&forecasts, &observations, day(1), day(1), DEFAULT_THRESHOLD_MM);
        assert_eq!(score(&scores, Some("D_1"), Metric::Mae), Some(0.0));
        assert!(score(&scores, Some("D_1"), Metric::Pod).is_none());
        assert!(score(&scores, Some("D_1"), Metric::Far).is_none());
        assert!(score(&scores, Some("D_1"), Metric::Csi).is_none());
    }

    #[test]
    fn test_only_paired_dates_and_areas_count() {
        let forecasts = vec![
            forecast(1, &[("D_1", Some(3.0)), ("D_2", Some(3.0))]),
            forecast(2, &[("D_1", Some(50.0))]),
        ];
        let observations = vec![observed(1, &[("D_1", 3.0)]), observed(3, &[("D_1", 0.0)])];
        let scores = compute_scores(&forecasts, &observations, day(1), day(3), DEFAULT_THRESHOLD_MM);

        assert_eq!(score(&scores, Some("D_1"), Metric::Mae), Some(0.0));
        assert!(score(&scores, Some("D_2"), Metric::Mae).is_none());
        let d1 = scores.iter().find(|s| s.area_id.as_deref() == Some("D_1")).unwrap();
        assert_eq!(d1.samples, 1);
    }

    #[test]
    fn test_dates_outside_range_are_ignored() {
        let forecasts = vec![forecast(1, &[("D_1", Some(3.0))]), forecast(5, &[("D_1", Some(9.0))])];
        let observations = vec![observed(1, &[("D_1", 3.0)]), observed(5, &[("D_1", 0.0)])];
        let scores = compute_scores(&forecasts, &observations, day(2), day(6), DEFAULT_THRESHOLD_MM);
        assert_eq!(score(&scores, Some("D_1"), Metric::Mae), Some(9.0));
    }

    #[test]
    fn test_regional_aggregate_pools_all_areas() {
        let forecasts = vec![forecast(1, &[("D_1", Some(10.0)), ("D_2", Some(0.0))])];
        let observations = vec![observed(1, &[("D_1", 10.0), ("D_2", 10.0)])];
        let scores = compute_scores(&forecasts, &observations, day(1), day(1), DEFAULT_THRESHOLD_MM);

        assert_eq!(score(&scores, None, Metric::Mae), Some(5.0));
        assert_eq!(score(&scores, None, Metric::Pod), Some(0.5));
        assert_eq!(score(&scores, None, Metric::Far), Some(0.0));
        let last = scores.last().unwrap();
        assert!(last.area_id.is_none());
        assert_eq!(last.samples, 2);
    }

    #[test]
    fn test_no_pairs_no_scores() {
        let scores = compute_scores(&[], &[], day(1), day(2), DEFAULT_THRESHOLD_MM);
        assert!(scores.is_empty());
    }
}
