use dioxus::prelude::*;
use rainmap_shared::feature::AreaCatalog;
use rainmap_shared::models::{parse_date, ForecastScope, RainfallCategory};
use rainmap_shared::session::ForecastSession;
use rainmap_shared::style::Granularity;

use crate::api;
use crate::components::category_panel::CategoryPanel;
use crate::components::date_panel::{today, DatePanel};
use crate::components::district_picker::DistrictPicker;
use crate::components::legend::Legend;
use crate::components::map_view::MapView;

const STATUS_TIMEOUT_MS: u32 = 4_000;
const RECENT_DATES: i32 = 7;

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        window.alert_with_message(message).ok();
    }
}

/// Show `message` in the header until a newer message replaces it or it times out.
fn show_status(mut status: Signal<Option<String>>, message: String) {
    status.set(Some(message.clone()));
    spawn(async move {
        gloo_timers::future::TimeoutFuture::new(STATUS_TIMEOUT_MS).await;
        if status.peek().as_deref() == Some(message.as_str()) {
            status.set(None);
        }
    });
}

/// Keep the address bar on `/forecast/{date}` without reloading the page.
fn show_date_in_url(date: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    let Ok(origin) = location.origin() else {
        return;
    };
    let url = api::build_forecast_url(&origin, date);
    if location.href().ok().as_deref() == Some(url.as_str()) {
        return;
    }
    if let Ok(history) = window.history() {
        history
            .replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&url))
            .ok();
    }
}

/// Scope recorded with a saved map, following which layers are on screen.
pub fn scope_for(granularity: Granularity) -> ForecastScope {
    match granularity {
        Granularity::Both => ForecastScope::Mixed,
        Granularity::Districts => ForecastScope::District,
        Granularity::States => ForecastScope::State,
    }
}

/// Initial date: the one in the URL when valid, otherwise today.
pub fn initial_date(from_url: Option<&str>) -> String {
    from_url
        .filter(|d| parse_date(d).is_some())
        .map(str::to_string)
        .unwrap_or_else(today)
}

/// The date to switch to when the route's date differs from the one on screen.
pub fn route_date_change(on_screen: &str, from_url: Option<&str>) -> Option<String> {
    let from_route = initial_date(from_url);
    (from_route != on_screen).then_some(from_route)
}

#[component]
pub fn ForecastEntry(date: Option<String>) -> Element {
    let mut catalog = use_signal(AreaCatalog::default);
    let mut session = use_signal(ForecastSession::default);
    let mut assets_ready = use_signal(|| false);

    let mut selected_date = use_signal(|| initial_date(date.as_deref()));
    let granularity = use_signal(Granularity::default);
    let hovered = use_signal(|| None::<String>);
    let focus = use_signal(|| None::<String>);
    let category = use_signal(|| None::<RainfallCategory>);
    let rainfall = use_signal(String::new);
    let status = use_signal(|| None::<String>);
    let mut saving = use_signal(|| false);
    let mut dates_version = use_signal(|| 0u32);

    // A new route date (a followed link) replaces the one on screen
    use_effect(use_reactive!(|date| {
        let change = route_date_change(&selected_date.peek(), date.as_deref());
        if let Some(new_date) = change {
            selected_date.set(new_date);
        }
    }));

    use_effect(move || show_date_in_url(&selected_date.read()));

    // Boundaries and state membership are fetched once
    let _assets_loader = use_resource(move || async move {
        match api::fetch_map_assets().await {
            Ok((loaded, districts)) => {
                session.set(ForecastSession::new(loaded.records(), districts));
                catalog.set(loaded);
            }
            Err(e) => {
                api::log_error(&format!("Failed to load map boundaries: {}", e));
                alert(&format!("Could not load the map boundaries: {}", e));
            }
        }
        assets_ready.set(true);
    });

    // Reload whenever the date changes; a date with nothing saved starts from DRY
    let _forecast_loader = use_resource(move || {
        let date = selected_date.read().clone();
        let ready = *assets_ready.read();
        async move {
            if !ready {
                return;
            }
            match api::load_forecast(&date).await {
                Ok(resp) => {
                    let matched = {
                        let mut s = session.write();
                        s.reset();
                        match resp.data {
                            Some(data) if resp.found => Some(s.apply_saved(&data)),
                            _ => None,
                        }
                    };
                    let message = match matched {
                        Some(n) => format!("Loaded forecast for {} ({} areas)", date, n),
                        None => format!("No saved forecast for {}; all areas set to DRY", date),
                    };
                    show_status(status, message);
                }
                Err(e) => {
                    api::log_error(&format!("Failed to load forecast for {}: {}", date, e));
                    alert(&format!("Could not load the forecast for {}: {}", date, e));
                }
            }
        }
    });

    let recent = use_resource(move || {
        let _version = *dates_version.read();
        async move {
            api::fetch_forecast_dates(RECENT_DATES)
                .await
                .unwrap_or_else(|e| {
                    api::log_warn(&format!("Failed to list saved dates: {}", e));
                    Vec::new()
                })
        }
    });
    let recent_dates = (*recent.read()).clone().unwrap_or_default();

    let on_save = move |_: ()| {
        let date = selected_date.read().clone();
        let request = session.read().save_request(&date, scope_for(*granularity.read()));
        saving.set(true);
        spawn(async move {
            match api::save_forecast(&request).await {
                Ok(resp) => {
                    let verb = if resp.created { "saved" } else { "updated" };
                    alert(&format!("Forecast for {} {}.", resp.date, verb));
                    *dates_version.write() += 1;
                }
                Err(e) => {
                    api::log_error(&format!("Failed to save forecast for {}: {}", date, e));
                    alert(&format!("Failed to save forecast: {}", e));
                }
            }
            saving.set(false);
        });
    };

    let on_error = move |message: String| alert(&message);

    let selected_count = session.read().selection().len();
    let area_count = session.read().areas().len();
    let ready = *assets_ready.read();

    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "Rainfall Forecast Map" }
                span { class: "header-info", "{area_count} areas, {selected_count} selected" }
                if let Some(message) = &*status.read() {
                    span { class: "status", "{message}" }
                }
            }

            div { class: "sidebar",
                DatePanel {
                    selected_date: selected_date,
                    granularity: granularity,
                    recent_dates: recent_dates,
                    saving: *saving.read(),
                    on_save: on_save,
                }
                CategoryPanel {
                    session: session,
                    category: category,
                    rainfall: rainfall,
                    on_error: on_error,
                }
                DistrictPicker { catalog: catalog, focus: focus }
                Legend { session: session }
            }

            if ready {
                MapView {
                    catalog: catalog,
                    session: session,
                    granularity: granularity,
                    hovered: hovered,
                    focus: focus,
                }
            } else {
                div { class: "map-loading", "Loading map..." }
            }
        }
    }
}
