use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{AreaLevel, AreaRecord, RainfallCategory};
use crate::session::ForecastSession;

pub const FILL_OPACITY: f64 = 0.85;

const SELECTED_STROKE: &str = "#2ecc71";
const HOVER_STROKE: &str = "#ff9900";
const STATE_STROKE: &str = "#111111";
const DISTRICT_STROKE: &str = "#444444";

/// How a single area is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub stroke_color: &'static str,
    pub stroke_weight: f64,
}

/// Fill follows the category; the outline marks selection, then hover, then level.
pub fn area_style(
    level: AreaLevel,
    category: RainfallCategory,
    selected: bool,
    hovered: bool,
) -> AreaStyle {
    let (stroke_color, stroke_weight) = if selected {
        (SELECTED_STROKE, 3.0)
    } else if hovered {
        (HOVER_STROKE, 3.0)
    } else {
        match level {
            AreaLevel::State => (STATE_STROKE, 2.0),
            AreaLevel::District => (DISTRICT_STROKE, 1.0),
        }
    };
    AreaStyle {
        fill_color: category.color(),
        fill_opacity: FILL_OPACITY,
        stroke_color,
        stroke_weight,
    }
}

/// Style for an area id in the session; unknown ids draw as DRY.
pub fn style_for(
    session: &ForecastSession,
    id: &str,
    level: AreaLevel,
    hovered: bool,
) -> AreaStyle {
    let category = session
        .get(id)
        .map(|rec| rec.category)
        .unwrap_or_default();
    area_style(level, category, session.is_selected(id), hovered)
}

pub fn tooltip_text(record: &AreaRecord) -> String {
    let mut text = format!(
        "{}\nLevel: {}\nCategory: {}",
        record.name, record.level, record.category
    );
    if let Some(mm) = record.rainfall_mm {
        text.push_str(&format!("\nRainfall: {mm} mm"));
    }
    text
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub category: RainfallCategory,
    pub color: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    pub selected: Vec<String>,
}

impl Legend {
    pub fn from_session(session: &ForecastSession) -> Self {
        Legend {
            entries: session
                .category_counts()
                .into_iter()
                .map(|(category, count)| LegendEntry {
                    category,
                    color: category.color(),
                    count,
                })
                .collect(),
            selected: session.selection().to_vec(),
        }
    }

    /// `"None"` or the selected ids joined by commas.
    pub fn selected_label(&self) -> String {
        if self.selected.is_empty() {
            "None".to_string()
        } else {
            self.selected.join(", ")
        }
    }
}

/// Which boundary layers are drawn and clickable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Both,
    Districts,
    States,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [
        Granularity::Both,
        Granularity::Districts,
        Granularity::States,
    ];

    pub fn value(self) -> &'static str {
        match self {
            Granularity::Both => "both",
            Granularity::Districts => "districts",
            Granularity::States => "states",
        }
    }

    pub fn shows(self, level: AreaLevel) -> bool {
        match self {
            Granularity::Both => true,
            Granularity::Districts => level == AreaLevel::District,
            Granularity::States => level == AreaLevel::State,
        }
    }

    /// Visible levels in hit-test priority order (districts above states).
    pub fn levels(self) -> &'static [AreaLevel] {
        match self {
            Granularity::Both => &[AreaLevel::District, AreaLevel::State],
            Granularity::Districts => &[AreaLevel::District],
            Granularity::States => &[AreaLevel::State],
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.value() == s)
            .ok_or_else(|| format!("Unknown granularity: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::districts::DistrictIndex;

    fn session() -> ForecastSession {
        ForecastSession::new(
            vec![
                AreaRecord::new("D_1", "Bankura", AreaLevel::District),
                AreaRecord::new("S_WB", "West Bengal", AreaLevel::State),
            ],
            DistrictIndex::default(),
        )
    }

    #[test]
    fn test_fill_follows_category() {
        let style = area_style(AreaLevel::District, RainfallCategory::Widespread, false, false);
        assert_eq!(style.fill_color, "#1c4587");
        assert_eq!(style.fill_opacity, FILL_OPACITY);
    }

    #[test]
    fn test_outline_by_level() {
        let district = area_style(AreaLevel::District, RainfallCategory::Dry, false, false);
        let state = area_style(AreaLevel::State, RainfallCategory::Dry, false, false);
        assert_eq!((district.stroke_color, district.stroke_weight), ("#444444", 1.0));
        assert_eq!((state.stroke_color, state.stroke_weight), ("#111111", 2.0));
    }

    #[test]
    fn test_selection_outline_beats_hover() {
        let selected = area_style(AreaLevel::State, RainfallCategory::Dry, true, true);
        assert_eq!(selected.stroke_color, "#2ecc71");
        let hovered = area_style(AreaLevel::State, RainfallCategory::Dry, false, true);
        assert_eq!(hovered.stroke_color, "#ff9900");
        assert_eq!(hovered.stroke_weight, 3.0);
    }

    #[test]
    fn test_style_for_reads_session() {
        let mut s = session();
        s.toggle("D_1");
        s.apply_category(RainfallCategory::Scattered);
        let style = style_for(&s, "D_1", AreaLevel::District, false);
        assert_eq!(style.fill_color, RainfallCategory::Scattered.color());
        assert_eq!(style.stroke_color, "#2ecc71");

        let unknown = style_for(&s, "D_404", AreaLevel::District, false);
        assert_eq!(unknown.fill_color, RainfallCategory::Dry.color());
    }

    #[test]
    fn test_tooltip_text() {
        let mut rec = AreaRecord::new("D_1", "Bankura", AreaLevel::District);
        assert_eq!(tooltip_text(&rec), "Bankura\nLevel: district\nCategory: DRY");
        rec.rainfall_mm = Some(3.5);
        assert!(tooltip_text(&rec).ends_with("Rainfall: 3.5 mm"));
    }

    #[test]
    fn test_legend_counts_and_selection() {
        let mut s = session();
        let legend = Legend::from_session(&s);
        assert_eq!(legend.entries.len(), 5);
        assert_eq!(legend.entries[0].count, 2);
        assert_eq!(legend.selected_label(), "None");

        s.toggle("S_WB");
        s.toggle("D_1");
        let legend = Legend::from_session(&s);
        assert_eq!(legend.selected_label(), "S_WB, D_1");
    }

    #[test]
    fn test_granularity_levels() {
        assert!(Granularity::Both.shows(AreaLevel::State));
        assert!(!Granularity::Districts.shows(AreaLevel::State));
        assert_eq!(Granularity::States.levels(), &[AreaLevel::State]);
        assert_eq!("districts".parse::<Granularity>(), Ok(Granularity::Districts));
        assert!("all".parse::<Granularity>().is_err());
    }
}
