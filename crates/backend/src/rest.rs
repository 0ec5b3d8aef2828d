//! JSON endpoints used by the forecast entry page.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rainmap_shared::models::{
    check_rainfall, parse_date, AreaForecast, ForecastData, ForecastScope, GetMapResponse,
    SaveMapResponse,
};
use serde::Deserialize;
use serde_json::Value;

use crate::assets::Assets;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub assets: Arc<Assets>,
}

type ApiError = (StatusCode, String);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

fn internal(message: String) -> ApiError {
    tracing::error!(error = %message, "Storage failure");
    (StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/forecast/save_map/", post(save_map))
        .route("/forecast/get_map/", get(get_map))
        .with_state(state)
}

/// Create or replace the map forecast for the date in the body.
async fn save_map(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SaveMapResponse>, ApiError> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| bad_request("Invalid JSON body."))?;

    let date_str = match payload.get("date") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(other) => Some(other),
    }
    .ok_or_else(|| bad_request("Missing 'date' in request body."))?;
    let date = date_str
        .as_str()
        .and_then(parse_date)
        .ok_or_else(|| bad_request("Invalid 'date' format. Use YYYY-MM-DD."))?;

    let Some(Value::Object(raw_data)) = payload.get("data") else {
        return Err(bad_request(
            "'data' must be an object mapping area_id -> forecast object.",
        ));
    };

    let scope = match payload.get("scope") {
        None | Some(Value::Null) => ForecastScope::default(),
        Some(Value::String(s)) => s.parse().map_err(bad_request)?,
        Some(_) => return Err(bad_request("'scope' must be a string.")),
    };

    let mut data = ForecastData::new();
    for (area_id, entry) in raw_data {
        let invalid = |e: String| {
            bad_request(format!("Invalid forecast for area '{}': {}", area_id, e))
        };
        let forecast: AreaForecast =
            serde_json::from_value(entry.clone()).map_err(|e| invalid(e.to_string()))?;
        if let Some(mm) = forecast.rainfall_mm {
            check_rainfall(area_id, mm).map_err(invalid)?;
        }
        data.insert(area_id.clone(), forecast);
    }

    if !state.assets.catalog.features.is_empty() {
        let unknown = data
            .keys()
            .filter(|id| state.assets.find_area(id).is_none())
            .count();
        if unknown > 0 {
            tracing::warn!(
                %date,
                unknown,
                "Saved forecast names areas missing from the boundary file"
            );
        }
    }

    let (saved, created) = state
        .storage
        .save_forecast(date, scope, data)
        .map_err(internal)?;
    tracing::info!(%date, %scope, areas = saved.data.len(), created, "Saved map forecast");

    let date = saved.date.to_string();
    Ok(Json(SaveMapResponse {
        ok: true,
        created,
        id: date.clone(),
        date,
    }))
}

#[derive(Debug, Deserialize)]
struct GetMapParams {
    date: Option<String>,
}

async fn get_map(
    State(state): State<AppState>,
    Query(params): Query<GetMapParams>,
) -> Result<Json<GetMapResponse>, ApiError> {
    let date_str = params
        .date
        .filter(|d| !d.is_empty())
        .ok_or_else(|| bad_request("Please provide ?date=YYYY-MM-DD"))?;
    let date = parse_date(&date_str).ok_or_else(|| bad_request("Invalid date format."))?;

    let response = match state.storage.get_forecast(date).map_err(internal)? {
        Some(forecast) => GetMapResponse {
            ok: true,
            found: true,
            date: forecast.date.to_string(),
            scope: Some(forecast.scope),
            data: Some(forecast.data),
        },
        None => GetMapResponse {
            ok: true,
            found: false,
            date: date_str,
            scope: None,
            data: None,
        },
    };
    Ok(Json(response))
}
