use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Object, SimpleObject};
use chrono::NaiveDate;
use rainmap_shared::{
    feature::AreaFeature,
    models::{
        self, check_rainfall, AreaForecast, AreaLevel, DistrictWarning, ForecastData,
        ForecastScope, ObservedData, RainfallCategory,
    },
    verify::{self, Metric, VerificationScore},
};

use crate::assets::Assets;
use crate::storage::Storage;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlCategory {
    Dry,
    Isol,
    Sct,
    Fws,
    Ws,
}

impl From<RainfallCategory> for GqlCategory {
    fn from(c: RainfallCategory) -> Self {
        match c {
            RainfallCategory::Dry => GqlCategory::Dry,
            RainfallCategory::Isolated => GqlCategory::Isol,
            RainfallCategory::Scattered => GqlCategory::Sct,
            RainfallCategory::FairlyWidespread => GqlCategory::Fws,
            RainfallCategory::Widespread => GqlCategory::Ws,
        }
    }
}

impl From<GqlCategory> for RainfallCategory {
    fn from(c: GqlCategory) -> Self {
        match c {
            GqlCategory::Dry => RainfallCategory::Dry,
            GqlCategory::Isol => RainfallCategory::Isolated,
            GqlCategory::Sct => RainfallCategory::Scattered,
            GqlCategory::Fws => RainfallCategory::FairlyWidespread,
            GqlCategory::Ws => RainfallCategory::Widespread,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlLevel {
    District,
    State,
}

impl From<AreaLevel> for GqlLevel {
    fn from(l: AreaLevel) -> Self {
        match l {
            AreaLevel::District => GqlLevel::District,
            AreaLevel::State => GqlLevel::State,
        }
    }
}

impl From<GqlLevel> for AreaLevel {
    fn from(l: GqlLevel) -> Self {
        match l {
            GqlLevel::District => AreaLevel::District,
            GqlLevel::State => AreaLevel::State,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlScope {
    District,
    State,
    Mixed,
}

impl From<ForecastScope> for GqlScope {
    fn from(s: ForecastScope) -> Self {
        match s {
            ForecastScope::District => GqlScope::District,
            ForecastScope::State => GqlScope::State,
            ForecastScope::Mixed => GqlScope::Mixed,
        }
    }
}

impl From<GqlScope> for ForecastScope {
    fn from(s: GqlScope) -> Self {
        match s {
            GqlScope::District => ForecastScope::District,
            GqlScope::State => ForecastScope::State,
            GqlScope::Mixed => ForecastScope::Mixed,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlMetric {
    Mae,
    Pod,
    Far,
    Csi,
}

impl From<Metric> for GqlMetric {
    fn from(m: Metric) -> Self {
        match m {
            Metric::Mae => GqlMetric::Mae,
            Metric::Pod => GqlMetric::Pod,
            Metric::Far => GqlMetric::Far,
            Metric::Csi => GqlMetric::Csi,
        }
    }
}

// GraphQL output types

#[derive(SimpleObject)]
pub struct GqlArea {
    pub id: String,
    pub name: String,
    pub level: GqlLevel,
    pub state_code: Option<String>,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bounds: Option<Vec<f64>>,
}

impl From<&AreaFeature> for GqlArea {
    fn from(f: &AreaFeature) -> Self {
        GqlArea {
            id: f.id.clone(),
            name: f.name.clone(),
            level: f.level.into(),
            state_code: f.state_code.clone(),
            bounds: f.bounds().map(|(x0, y0, x1, y1)| vec![x0, y0, x1, y1]),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlAreaForecast {
    pub area_id: String,
    pub name: Option<String>,
    pub level: Option<GqlLevel>,
    pub category: GqlCategory,
    pub rainfall_mm: Option<f64>,
}

#[derive(SimpleObject)]
pub struct GqlMapForecast {
    pub date: NaiveDate,
    pub scope: GqlScope,
    pub areas: Vec<GqlAreaForecast>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::MapForecast> for GqlMapForecast {
    fn from(f: models::MapForecast) -> Self {
        GqlMapForecast {
            date: f.date,
            scope: f.scope.into(),
            areas: f
                .data
                .into_iter()
                .map(|(area_id, a)| GqlAreaForecast {
                    area_id,
                    name: a.name,
                    level: a.level.map(GqlLevel::from),
                    category: a.category.into(),
                    rainfall_mm: a.rainfall_mm,
                })
                .collect(),
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlObservation {
    pub area_id: String,
    pub rainfall_mm: f64,
}

#[derive(SimpleObject)]
pub struct GqlRealizedMap {
    pub date: NaiveDate,
    pub observations: Vec<GqlObservation>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::RealizedMap> for GqlRealizedMap {
    fn from(r: models::RealizedMap) -> Self {
        GqlRealizedMap {
            date: r.date,
            observations: r
                .data
                .into_iter()
                .map(|(area_id, rainfall_mm)| GqlObservation { area_id, rainfall_mm })
                .collect(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlVerificationScore {
    pub date: NaiveDate,
    pub metric: GqlMetric,
    /// Null for the score over every area.
    pub area_id: Option<String>,
    pub value: f64,
    pub samples: u64,
}

impl From<VerificationScore> for GqlVerificationScore {
    fn from(s: VerificationScore) -> Self {
        GqlVerificationScore {
            date: s.date,
            metric: s.metric.into(),
            area_id: s.area_id,
            value: s.value,
            samples: s.samples as u64,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlWarning {
    pub area_id: String,
    /// District name from the boundary file, when known.
    pub name: Option<String>,
    pub date: NaiveDate,
    pub horizon: u16,
    pub phenomenon: String,
    pub severity: Option<String>,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl GqlWarning {
    fn new(w: DistrictWarning, assets: &Assets) -> Self {
        GqlWarning {
            name: assets.find_area(&w.area_id).map(|f| f.name.clone()),
            area_id: w.area_id,
            date: w.date,
            horizon: w.horizon,
            phenomenon: w.phenomenon,
            severity: w.severity,
            description: w.description,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlWarningSaved {
    pub created: bool,
    pub warning: GqlWarning,
}

#[derive(SimpleObject)]
pub struct GqlSaveResult {
    pub date: NaiveDate,
    pub created: bool,
    pub areas: u64,
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub total_forecasts: u64,
    pub total_realized: u64,
    pub total_warnings: u64,
    pub db_size_bytes: u64,
    pub districts: u64,
    pub states: u64,
}

// Input types

#[derive(InputObject)]
pub struct AreaForecastInput {
    pub area_id: String,
    pub category: GqlCategory,
    pub rainfall_mm: Option<f64>,
}

#[derive(InputObject)]
pub struct SaveMapForecastInput {
    pub date: NaiveDate,
    pub scope: Option<GqlScope>,
    pub areas: Vec<AreaForecastInput>,
}

#[derive(InputObject)]
pub struct ObservationInput {
    pub area_id: String,
    pub rainfall_mm: f64,
}

#[derive(InputObject)]
pub struct WarningInput {
    pub area_id: String,
    pub date: NaiveDate,
    /// Lead time in days, 1 when omitted.
    pub horizon: Option<u16>,
    pub phenomenon: String,
    pub severity: Option<String>,
    pub description: Option<String>,
}

fn rainfall(area_id: &str, mm: f64) -> async_graphql::Result<f64> {
    check_rainfall(area_id, mm).map_err(async_graphql::Error::new)
}

/// Warnings are issued per district; with no boundary file loaded any `D_` id is accepted.
fn check_warning_area(assets: &Assets, area_id: &str) -> async_graphql::Result<()> {
    let is_district = match assets.find_area(area_id) {
        Some(f) => f.level == AreaLevel::District,
        None => {
            assets.catalog.features.is_empty()
                && AreaLevel::of_id(area_id) == Some(AreaLevel::District)
        }
    };
    if is_district {
        Ok(())
    } else {
        Err(async_graphql::Error::new(format!(
            "'{}' is not a known district",
            area_id
        )))
    }
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Areas from the boundary file, optionally one level only.
    async fn areas(
        &self,
        ctx: &Context<'_>,
        level: Option<GqlLevel>,
    ) -> async_graphql::Result<Vec<GqlArea>> {
        let assets = ctx.data::<Arc<Assets>>()?;
        let level: Option<AreaLevel> = level.map(Into::into);
        Ok(assets
            .catalog
            .features
            .iter()
            .filter(|f| level.map_or(true, |l| f.level == l))
            .map(GqlArea::from)
            .collect())
    }

    /// District ids that belong to a state (`S_<code>` or bare code).
    async fn districts_of_state(
        &self,
        ctx: &Context<'_>,
        state_id: String,
    ) -> async_graphql::Result<Vec<String>> {
        let assets = ctx.data::<Arc<Assets>>()?;
        Ok(assets.districts.districts_of(&state_id).to_vec())
    }

    async fn map_forecast(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
    ) -> async_graphql::Result<Option<GqlMapForecast>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let forecast = storage.get_forecast(date).map_err(async_graphql::Error::new)?;
        Ok(forecast.map(GqlMapForecast::from))
    }

    /// Dates with a saved forecast, newest first.
    async fn forecast_dates(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
    ) -> async_graphql::Result<Vec<NaiveDate>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let mut dates = storage.forecast_dates().map_err(async_graphql::Error::new)?;
        if let Some(limit) = limit {
            dates.truncate(limit.max(0) as usize);
        }
        Ok(dates)
    }

    async fn realized_map(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
    ) -> async_graphql::Result<Option<GqlRealizedMap>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let realized = storage.get_realized(date).map_err(async_graphql::Error::new)?;
        Ok(realized.map(GqlRealizedMap::from))
    }

    /// Scores for every forecast in `[start, end]` that has observations.
    async fn verification(
        &self,
        ctx: &Context<'_>,
        start: NaiveDate,
        end: NaiveDate,
        threshold: Option<f64>,
    ) -> async_graphql::Result<Vec<GqlVerificationScore>> {
        if start > end {
            return Err(async_graphql::Error::new("start must not be after end"));
        }
        let threshold = threshold.unwrap_or(verify::DEFAULT_THRESHOLD_MM);
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(async_graphql::Error::new("threshold must be a positive number of mm"));
        }

        let storage = ctx.data::<Arc<Storage>>()?;
        let forecasts = storage
            .forecasts_between(start, end)
            .map_err(async_graphql::Error::new)?;
        let observations = storage
            .realized_between(start, end)
            .map_err(async_graphql::Error::new)?;

        let scores = verify::compute_scores(&forecasts, &observations, start, end, threshold);
        tracing::debug!(
            %start,
            %end,
            forecasts = forecasts.len(),
            scores = scores.len(),
            "Computed verification"
        );
        Ok(scores.into_iter().map(GqlVerificationScore::from).collect())
    }

    /// Warnings dated within `[start, end]`, optionally for one district.
    async fn warnings(
        &self,
        ctx: &Context<'_>,
        start: NaiveDate,
        end: NaiveDate,
        area_id: Option<String>,
    ) -> async_graphql::Result<Vec<GqlWarning>> {
        if start > end {
            return Err(async_graphql::Error::new("start must not be after end"));
        }
        let storage = ctx.data::<Arc<Storage>>()?;
        let assets = ctx.data::<Arc<Assets>>()?;
        let warnings = storage
            .warnings_between(start, end)
            .map_err(async_graphql::Error::new)?;
        Ok(warnings
            .into_iter()
            .filter(|w| area_id.as_deref().map_or(true, |id| w.area_id == id))
            .map(|w| GqlWarning::new(w, assets))
            .collect())
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let assets = ctx.data::<Arc<Assets>>()?;
        Ok(GqlStats {
            total_forecasts: storage.count_forecasts().map_err(async_graphql::Error::new)?,
            total_realized: storage.count_realized().map_err(async_graphql::Error::new)?,
            total_warnings: storage.count_warnings().map_err(async_graphql::Error::new)?,
            db_size_bytes: storage.db_size_bytes().map_err(async_graphql::Error::new)?,
            districts: assets.catalog.of_level(AreaLevel::District).count() as u64,
            states: assets.catalog.of_level(AreaLevel::State).count() as u64,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create or replace the forecast for a date.
    async fn save_map_forecast(
        &self,
        ctx: &Context<'_>,
        input: SaveMapForecastInput,
    ) -> async_graphql::Result<GqlSaveResult> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let assets = ctx.data::<Arc<Assets>>()?;

        let mut data = ForecastData::new();
        for area in input.areas {
            let rainfall_mm = area
                .rainfall_mm
                .map(|mm| rainfall(&area.area_id, mm))
                .transpose()?;
            let feature = assets.find_area(&area.area_id);
            data.insert(
                area.area_id.clone(),
                AreaForecast {
                    category: area.category.into(),
                    rainfall_mm,
                    name: feature.map(|f| f.name.clone()),
                    level: feature.map(|f| f.level).or_else(|| AreaLevel::of_id(&area.area_id)),
                },
            );
        }

        let scope = input.scope.map(ForecastScope::from).unwrap_or_default();
        let (saved, created) = storage
            .save_forecast(input.date, scope, data)
            .map_err(async_graphql::Error::new)?;
        tracing::info!(date = %saved.date, areas = saved.data.len(), created, "Saved map forecast");

        Ok(GqlSaveResult {
            date: saved.date,
            created,
            areas: saved.data.len() as u64,
        })
    }

    async fn delete_map_forecast(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
    ) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        storage.delete_forecast(date).map_err(async_graphql::Error::new)
    }

    /// Create or replace observed rainfall for a date.
    async fn save_realized_map(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
        observations: Vec<ObservationInput>,
    ) -> async_graphql::Result<GqlSaveResult> {
        let storage = ctx.data::<Arc<Storage>>()?;

        let mut data = ObservedData::new();
        for obs in observations {
            let mm = rainfall(&obs.area_id, obs.rainfall_mm)?;
            data.insert(obs.area_id, mm);
        }

        let (saved, created) = storage
            .save_realized(date, data)
            .map_err(async_graphql::Error::new)?;
        tracing::info!(date = %saved.date, areas = saved.data.len(), created, "Saved realized map");

        Ok(GqlSaveResult {
            date: saved.date,
            created,
            areas: saved.data.len() as u64,
        })
    }

    /// Create or replace a district warning.
    async fn save_warning(
        &self,
        ctx: &Context<'_>,
        input: WarningInput,
    ) -> async_graphql::Result<GqlWarningSaved> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let assets = ctx.data::<Arc<Assets>>()?;

        check_warning_area(assets, input.area_id.trim())?;
        let warning = DistrictWarning::new(
            &input.area_id,
            input.date,
            input.horizon.unwrap_or(1),
            &input.phenomenon,
            input.severity.as_deref(),
            input.description.as_deref().unwrap_or_default(),
        )
        .map_err(async_graphql::Error::new)?;

        let (saved, created) = storage
            .save_warning(warning)
            .map_err(async_graphql::Error::new)?;
        tracing::info!(
            date = %saved.date,
            area = %saved.area_id,
            phenomenon = %saved.phenomenon,
            created,
            "Saved district warning"
        );

        Ok(GqlWarningSaved {
            created,
            warning: GqlWarning::new(saved, assets),
        })
    }

    async fn delete_warning(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
        area_id: String,
        horizon: Option<u16>,
        phenomenon: String,
    ) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        storage
            .delete_warning(date, area_id.trim(), horizon.unwrap_or(1), phenomenon.trim())
            .map_err(async_graphql::Error::new)
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(assets: Arc<Assets>, storage: Arc<Storage>) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(assets)
        .data(storage)
        .finish()
}
