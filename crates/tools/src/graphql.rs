use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Post one GraphQL operation and return its `data`, failing on any reported error.
pub fn post<T: DeserializeOwned>(url: &str, query: &str, variables: Value) -> Result<T> {
    let client = reqwest::blocking::Client::new();
    let body = serde_json::json!({ "query": query, "variables": variables });

    eprintln!("Posting to {url}...");
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("{url} returned HTTP {status}");
    }

    let parsed: GraphQlResponse<T> = resp
        .json()
        .with_context(|| format!("Failed to parse response from {url}"))?;
    into_data(parsed)
}

fn into_data<T>(resp: GraphQlResponse<T>) -> Result<T> {
    if let Some(errors) = resp.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        bail!("GraphQL error: {}", messages.join("; "));
    }
    resp.data.ok_or_else(|| anyhow!("GraphQL response had no data"))
}
