use rainmap_shared::districts::DistrictIndex;
use rainmap_shared::feature::AreaCatalog;
use rainmap_shared::models::{GetMapResponse, SaveMapRequest, SaveMapResponse};
use serde::{Deserialize, Serialize};

/// Boundary file and district CSV, relative to `/static/`.
pub const GEOJSON_PATH: &str = "geojson/combined_regions.geojson";
pub const DISTRICTS_CSV_PATH: &str = "data/districts_from_geojson.csv";

pub fn build_static_url(origin: &str, path: &str) -> String {
    format!("{}/static/{}", origin, path.trim_start_matches('/'))
}

pub fn build_get_map_url(origin: &str, date: &str) -> String {
    format!("{}/forecast/get_map/?date={}", origin, date)
}

pub fn build_save_map_url(origin: &str) -> String {
    format!("{}/forecast/save_map/", origin)
}

/// Shareable page URL for one forecast date.
pub fn build_forecast_url(origin: &str, date: &str) -> String {
    format!("{}/forecast/{}", origin, date)
}

pub fn log_error(message: &str) {
    web_sys::console::error_1(&message.into());
}

pub fn log_warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

fn origin() -> Result<String, String> {
    web_sys::window()
        .ok_or("No window")?
        .location()
        .origin()
        .map_err(|_| "Cannot read page origin".to_string())
}

async fn fetch_text(url: &str) -> Result<String, String> {
    let resp = reqwest::get(url).await.map_err(|e| e.to_string())?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("{} returned {}: {}", url, status, text));
    }
    Ok(text)
}

/// Fetch the boundaries and the state membership CSV.
///
/// The boundaries are required. Without the CSV, membership comes from the
/// state codes recorded on district features.
pub async fn fetch_map_assets() -> Result<(AreaCatalog, DistrictIndex), String> {
    let origin = origin()?;
    let geojson = fetch_text(&build_static_url(&origin, GEOJSON_PATH)).await?;
    let catalog = AreaCatalog::from_geojson_str(&geojson).map_err(|e| format!("{:#}", e))?;

    let districts = match fetch_text(&build_static_url(&origin, DISTRICTS_CSV_PATH)).await {
        Ok(csv) => DistrictIndex::from_csv_str(&csv).unwrap_or_else(|e| {
            log_warn(&format!("Bad districts CSV, using boundary file: {:#}", e));
            DistrictIndex::from_catalog(&catalog)
        }),
        Err(e) => {
            log_warn(&format!("Failed to load districts CSV, using boundary file: {}", e));
            DistrictIndex::from_catalog(&catalog)
        }
    };
    Ok((catalog, districts))
}

pub async fn load_forecast(date: &str) -> Result<GetMapResponse, String> {
    let url = build_get_map_url(&origin()?, date);
    let text = fetch_text(&url).await?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

pub async fn save_forecast(request: &SaveMapRequest) -> Result<SaveMapResponse, String> {
    let resp = reqwest::Client::new()
        .post(build_save_map_url(&origin()?))
        .json(request)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("{}: {}", status, body));
    }
    resp.json().await.map_err(|e| e.to_string())
}

// GraphQL

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };

    let resp = reqwest::Client::new()
        .post(format!("{}/graphql", origin()?))
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;

    if let Some(errors) = gql_resp.errors {
        if !errors.is_empty() {
            return Err(errors[0].message.clone());
        }
    }

    gql_resp.data.ok_or_else(|| "No data returned".to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDatesResponse {
    pub forecast_dates: Vec<String>,
}

/// Most recent dates with a saved forecast, newest first.
pub async fn fetch_forecast_dates(limit: i32) -> Result<Vec<String>, String> {
    let resp: ForecastDatesResponse = query(
        r#"query ForecastDates($limit: Int) { forecastDates(limit: $limit) }"#,
        Some(serde_json::json!({ "limit": limit })),
    )
    .await?;
    Ok(resp.forecast_dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainmap_shared::models::{ForecastScope, RainfallCategory};

    #[test]
    fn test_static_urls() {
        assert_eq!(
            build_static_url("http://localhost:3000", GEOJSON_PATH),
            "http://localhost:3000/static/geojson/combined_regions.geojson"
        );
        assert_eq!(
            build_static_url("http://localhost:3000", "/data/x.csv"),
            "http://localhost:3000/static/data/x.csv"
        );
    }

    #[test]
    fn test_forecast_urls() {
        assert_eq!(
            build_get_map_url("https://rain.example.org", "2025-07-01"),
            "https://rain.example.org/forecast/get_map/?date=2025-07-01"
        );
        assert_eq!(
            build_save_map_url("https://rain.example.org"),
            "https://rain.example.org/forecast/save_map/"
        );
        assert_eq!(
            build_forecast_url("https://rain.example.org", "2025-07-01"),
            "https://rain.example.org/forecast/2025-07-01"
        );
    }

    #[test]
    fn test_get_map_found_deserializes() {
        let json = r#"{"ok":true,"found":true,"date":"2025-07-01","scope":"mixed","data":{"D_1":{"category":"FWS","rainfall_mm":12.0}}}"#;
        let resp: GetMapResponse = serde_json::from_str(json).unwrap();
        assert!(resp.found);
        assert_eq!(resp.scope, Some(ForecastScope::Mixed));
        assert_eq!(resp.data.unwrap()["D_1"].category, RainfallCategory::FairlyWidespread);
    }

    #[test]
    fn test_get_map_not_found_deserializes() {
        let json = r#"{"ok":true,"found":false,"date":"2025-07-01"}"#;
        let resp: GetMapResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.found);
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_save_response_deserializes() {
        let json = r#"{"ok":true,"created":false,"id":"2025-07-01","date":"2025-07-01"}"#;
        let resp: SaveMapResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.created);
        assert_eq!(resp.date, "2025-07-01");
    }

    #[test]
    fn test_graphql_request_omits_null_variables() {
        let req = GraphQLRequest {
            query: "{ forecastDates }".to_string(),
            variables: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("variables").is_none());
    }

    #[test]
    fn test_forecast_dates_response_deserializes() {
        let json = r#"{"forecastDates":["2025-07-03","2025-07-01"]}"#;
        let resp: ForecastDatesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.forecast_dates, vec!["2025-07-03", "2025-07-01"]);
    }

    #[test]
    fn test_graphql_error_response() {
        let json = r#"{"data":null,"errors":[{"message":"start must not be after end"}]}"#;
        let resp: GraphQLResponse<ForecastDatesResponse> = serde_json::from_str(json).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors.unwrap()[0].message, "start must not be after end");
    }
}
