use std::fmt::Write;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::cli::VerifyArgs;
use crate::graphql;

const VERIFICATION: &str = "query Verification($start: NaiveDate!, $end: NaiveDate!, $threshold: Float) { \
    verification(start: $start, end: $end, threshold: $threshold) { date metric areaId value samples } }";

const METRIC_ORDER: [&str; 4] = ["MAE", "POD", "FAR", "CSI"];

#[derive(Deserialize)]
struct VerificationData {
    verification: Vec<ScoreRow>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ScoreRow {
    date: String,
    metric: String,
    area_id: Option<String>,
    value: f64,
    samples: u64,
}

pub fn run(args: &VerifyArgs) -> Result<()> {
    if args.start > args.end {
        bail!("--start {} is after --end {}", args.start, args.end);
    }
    if let Some(t) = args.threshold {
        if !t.is_finite() || t <= 0.0 {
            bail!("--threshold must be a positive number of mm");
        }
    }

    let variables = serde_json::json!({
        "start": args.start,
        "end": args.end,
        "threshold": args.threshold,
    });
    let data: VerificationData = graphql::post(&args.url, VERIFICATION, variables)?;

    if data.verification.is_empty() {
        println!("No forecast/observation pairs between {} and {}", args.start, args.end);
    } else {
        print!("{}", format_scores(data.verification));
    }
    Ok(())
}

fn metric_rank(metric: &str) -> usize {
    METRIC_ORDER
        .iter()
        .position(|m| *m == metric)
        .unwrap_or(METRIC_ORDER.len())
}

/// Table with the regional scores first, then areas by id.
fn format_scores(mut rows: Vec<ScoreRow>) -> String {
    rows.sort_by(|a, b| {
        a.area_id
            .is_some()
            .cmp(&b.area_id.is_some())
            .then_with(|| a.area_id.cmp(&b.area_id))
            .then_with(|| metric_rank(&a.metric).cmp(&metric_rank(&b.metric)))
    });

    let area_width = rows
        .iter()
        .filter_map(|r| r.area_id.as_deref())
        .map(str::len)
        .max()
        .unwrap_or(0)
        .max("(all areas)".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<area_width$}  {:<6}  {:>9}  {:>7}  {}",
        "area", "metric", "value", "samples", "through"
    );
    for row in &rows {
        let _ = writeln!(
            out,
            "{:<area_width$}  {:<6}  {:>9.3}  {:>7}  {}",
            row.area_id.as_deref().unwrap_or("(all areas)"),
            row.metric,
            row.value,
            row.samples,
            row.date
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(area: Option<&str>, metric: &str, value: f64) -> ScoreRow {
        ScoreRow {
            date: "2025-07-03".into(),
            metric: metric.into(),
            area_id: area.map(str::to_string),
            value,
            samples: 3,
        }
    }

    #[test]
    fn test_regional_rows_come_first() {
        let table = format_scores(vec![
            row(Some("D_2"), "MAE", 1.0),
            row(None, "POD", 0.5),
            row(Some("D_1"), "CSI", 0.25),
            row(None, "MAE", 2.0),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("area"));
        assert!(lines[1].starts_with("(all areas)  MAE"));
        assert!(lines[2].starts_with("(all areas)  POD"));
        assert!(lines[3].starts_with("D_1"));
        assert!(lines[4].starts_with("D_2"));
    }

    #[test]
    fn test_values_use_three_decimals() {
        let table = format_scores(vec![row(None, "FAR", 1.0 / 3.0)]);
        assert!(table.contains("0.333"));
        assert!(table.trim_end().ends_with("2025-07-03"));
    }

    #[test]
    fn test_metric_rank_orders_known_metrics() {
        assert!(metric_rank("MAE") < metric_rank("POD"));
        assert!(metric_rank("CSI") < metric_rank("UNKNOWN"));
    }
}
