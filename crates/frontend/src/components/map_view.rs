use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use rainmap_shared::feature::AreaCatalog;
use rainmap_shared::models::AreaLevel;
use rainmap_shared::session::ForecastSession;
use rainmap_shared::style::{self, Granularity};

use crate::coords::{self, Projection, VIEW_WIDTH};

const MAP_CONTAINER_ID: &str = "rainfall-map-container";

/// Drag threshold in pixels; movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

const ZOOM_MIN: f64 = 1.0;
const ZOOM_MAX: f64 = 12.0;
const ZOOM_STEP: f64 = 1.1;

/// Margin in pixels left around a district framed from the picker.
const FOCUS_PADDING: f64 = 20.0;

/// Pre-projected outline of one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPath {
    pub id: String,
    pub level: AreaLevel,
    pub d: String,
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn container_rect() -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(MAP_CONTAINER_ID)?;
    Some(element.get_bounding_client_rect())
}

// ---------------------------------------------------------------------------
// Zoom / pan math
// ---------------------------------------------------------------------------

/// New pan offsets that keep `cursor` over the same content point
/// when zooming from `old_zoom` to `new_zoom`.
fn zoom_pan_at_cursor(
    cursor_x: f64,
    cursor_y: f64,
    old_zoom: f64,
    new_zoom: f64,
    old_pan_x: f64,
    old_pan_y: f64,
) -> (f64, f64) {
    let content_x = (cursor_x - old_pan_x) / old_zoom;
    let content_y = (cursor_y - old_pan_y) / old_zoom;
    (
        cursor_x - content_x * new_zoom,
        cursor_y - content_y * new_zoom,
    )
}

/// Clamp pan values so the map can't be dragged off-screen.
///
/// The SVG renders at `width: 100%`, so its height is `container_w * aspect`
/// where `aspect` is viewBox height over width.
fn clamp_pan(
    pan_x: f64,
    pan_y: f64,
    zoom: f64,
    container_w: f64,
    container_h: f64,
    aspect: f64,
) -> (f64, f64) {
    let content_w = container_w * zoom;
    let content_h = container_w * aspect * zoom;
    let min_pan_x = -(content_w - container_w).max(0.0);
    let min_pan_y = -(content_h - container_h).max(0.0);
    (pan_x.clamp(min_pan_x, 0.0), pan_y.clamp(min_pan_y, 0.0))
}

/// Zoom and pan that centre the viewBox box `(x0, y0, x1, y1)` in the
/// container, as large as fits inside `FOCUS_PADDING`.
fn fit_view(
    view_box: (f64, f64, f64, f64),
    view_width: f64,
    container_w: f64,
    container_h: f64,
    aspect: f64,
) -> Option<(f64, f64, f64)> {
    if view_width <= 0.0 || container_w <= 0.0 || container_h <= 0.0 {
        return None;
    }
    let (x0, y0, x1, y1) = view_box;
    // pixels per viewBox unit at zoom 1
    let scale = container_w / view_width;
    let box_w = ((x1 - x0) * scale).max(1.0);
    let box_h = ((y1 - y0) * scale).max(1.0);
    let room_w = (container_w - 2.0 * FOCUS_PADDING).max(1.0);
    let room_h = (container_h - 2.0 * FOCUS_PADDING).max(1.0);
    let zoom = (room_w / box_w).min(room_h / box_h).clamp(ZOOM_MIN, ZOOM_MAX);

    let center_x = (x0 + x1) / 2.0 * scale * zoom;
    let center_y = (y0 + y1) / 2.0 * scale * zoom;
    let (pan_x, pan_y) = clamp_pan(
        container_w / 2.0 - center_x,
        container_h / 2.0 - center_y,
        zoom,
        container_w,
        container_h,
        aspect,
    );
    Some((zoom, pan_x, pan_y))
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

// ---------------------------------------------------------------------------
// SVG building
// ---------------------------------------------------------------------------

pub fn project_paths(catalog: &AreaCatalog, projection: &Projection) -> Vec<AreaPath> {
    catalog
        .features
        .iter()
        .filter(|f| !f.rings.is_empty())
        .map(|f| AreaPath {
            id: f.id.clone(),
            level: f.level,
            d: projection.feature_path(f),
        })
        .collect()
}

fn push_path(svg: &mut String, d: &str, fill: Option<(&str, f64)>, stroke: &str, weight: f64) {
    let fill_attrs = match fill {
        Some((color, opacity)) => format!(r#"fill="{color}" fill-opacity="{opacity}""#),
        None => r#"fill="none""#.to_string(),
    };
    svg.push_str(&format!(
        r#"<path d="{d}" {fill_attrs} fill-rule="evenodd" stroke="{stroke}" stroke-width="{weight}" stroke-linejoin="round" vector-effect="non-scaling-stroke"/>"#
    ));
}

/// Draw visible areas: state fills, district fills, state outlines on top of
/// districts, and finally the selected or hovered outlines so they are never
/// covered by a neighbour.
fn build_svg_content(
    paths: &[AreaPath],
    session: &ForecastSession,
    granularity: Granularity,
    hovered: Option<&str>,
) -> String {
    let mut svg = String::new();
    let visible = |level: AreaLevel| {
        paths
            .iter()
            .filter(move |p| p.level == level && granularity.shows(level))
    };

    for level in [AreaLevel::State, AreaLevel::District] {
        for p in visible(level) {
            let s = style::style_for(session, &p.id, p.level, false);
            let fill = Some((s.fill_color, s.fill_opacity));
            push_path(&mut svg, &p.d, fill, s.stroke_color, s.stroke_weight);
        }
    }

    if granularity == Granularity::Both {
        for p in visible(AreaLevel::State) {
            let s = style::style_for(session, &p.id, p.level, false);
            push_path(&mut svg, &p.d, None, s.stroke_color, s.stroke_weight);
        }
    }

    for p in paths.iter().filter(|p| granularity.shows(p.level)) {
        let is_hovered = hovered == Some(p.id.as_str());
        if session.is_selected(&p.id) || is_hovered {
            let s = style::style_for(session, &p.id, p.level, is_hovered);
            push_path(&mut svg, &p.d, None, s.stroke_color, s.stroke_weight);
        }
    }
    svg
}

/// Bounding box of an area in viewBox coordinates.
fn area_view_box(
    catalog: &AreaCatalog,
    projection: &Projection,
    id: &str,
) -> Option<(f64, f64, f64, f64)> {
    let (min_lon, min_lat, max_lon, max_lat) = catalog.get(id)?.bounds()?;
    let (x0, y0) = projection.project(min_lon, max_lat);
    let (x1, y1) = projection.project(max_lon, min_lat);
    Some((x0, y0, x1, y1))
}

/// Area id under a container point, among the layers `granularity` shows.
fn area_at(
    catalog: &AreaCatalog,
    projection: &Projection,
    granularity: Granularity,
    container: (f64, f64, f64),
    zoom: f64,
    pan: (f64, f64),
) -> Option<String> {
    let (cx, cy, cw) = container;
    let (vx, vy) = coords::container_to_view(cx, cy, cw, projection.width, zoom, pan.0, pan.1)?;
    let (lon, lat) = projection.unproject(vx, vy);
    catalog
        .hit_test(lon, lat, granularity.levels())
        .map(|f| f.id.clone())
}

#[component]
pub fn MapView(
    catalog: Signal<AreaCatalog>,
    session: Signal<ForecastSession>,
    granularity: Signal<Granularity>,
    hovered: Signal<Option<String>>,
    focus: Signal<Option<String>>,
) -> Element {
    let mut zoom = use_signal(|| 1.0_f64);
    let mut pan_x = use_signal(|| 0.0_f64);
    let mut pan_y = use_signal(|| 0.0_f64);

    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start_x = use_signal(|| 0.0_f64);
    let mut drag_start_y = use_signal(|| 0.0_f64);
    let mut drag_start_pan_x = use_signal(|| 0.0_f64);
    let mut drag_start_pan_y = use_signal(|| 0.0_f64);

    // Container-relative cursor position for the tooltip
    let mut cursor = use_signal(|| (0.0_f64, 0.0_f64));

    let projection = use_memo(move || {
        catalog
            .read()
            .bounds()
            .and_then(|b| Projection::fit(b, VIEW_WIDTH))
    });

    // Geometry is projected once; styling below reruns on every session change
    let paths = use_memo(move || match *projection.read() {
        Some(p) => project_paths(&catalog.read(), &p),
        None => Vec::new(),
    });

    let svg_html = use_memo(move || {
        let Some(p) = *projection.read() else {
            return String::new();
        };
        let content = build_svg_content(
            &paths.read(),
            &session.read(),
            *granularity.read(),
            hovered.read().as_deref(),
        );
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" style="display:block;width:100%;height:auto;pointer-events:none;">{}</svg>"#,
            p.width, p.height, content
        )
    });

    let aspect = match *projection.read() {
        Some(p) => p.height / p.width,
        None => 1.0,
    };

    // Frame the district chosen in the picker and outline it
    use_effect(move || {
        let Some(id) = focus.read().clone() else {
            return;
        };
        let Some(p) = *projection.peek() else { return };
        let Some(rect) = container_rect() else { return };
        let Some(view_box) = area_view_box(&catalog.peek(), &p, &id) else {
            return;
        };
        let aspect = p.height / p.width;
        if let Some((z, px, py)) = fit_view(view_box, p.width, rect.width(), rect.height(), aspect)
        {
            zoom.set(z);
            pan_x.set(px);
            pan_y.set(py);
        }
        hovered.set(Some(id));
    });

    let hit = move |client_x: f64, client_y: f64| -> Option<String> {
        let p = (*projection.read())?;
        let container = coords::client_to_container(client_x, client_y, MAP_CONTAINER_ID)?;
        area_at(
            &catalog.read(),
            &p,
            *granularity.read(),
            container,
            *zoom.read(),
            (*pan_x.read(), *pan_y.read()),
        )
    };

    let cur_pan_x = *pan_x.read();
    let cur_pan_y = *pan_y.read();
    let cur_zoom = *zoom.read();
    let transform_style = format!(
        "transform: translate({cur_pan_x}px, {cur_pan_y}px) scale({cur_zoom}); transform-origin: 0 0;"
    );
    let container_class = if *is_dragging.read() && *did_drag.read() {
        "map-container dragging"
    } else {
        "map-container"
    };

    let tooltip = hovered
        .read()
        .as_deref()
        .and_then(|id| session.read().get(id).map(style::tooltip_text));
    let (tip_x, tip_y) = *cursor.read();
    let (tip_left, tip_top) = (tip_x + 14.0, tip_y + 14.0);

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();

                let delta_y = wheel_delta_y(evt.data().delta());
                let factor = if delta_y < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                let old_z = *zoom.read();
                let new_z = (old_z * factor).clamp(ZOOM_MIN, ZOOM_MAX);
                if (new_z - old_z).abs() < 1e-9 {
                    return;
                }

                let Some(rect) = container_rect() else { return };
                let client = evt.data().client_coordinates();
                let cx = client.x - rect.left();
                let cy = client.y - rect.top();

                let (new_px, new_py) =
                    zoom_pan_at_cursor(cx, cy, old_z, new_z, *pan_x.read(), *pan_y.read());
                let (px, py) =
                    clamp_pan(new_px, new_py, new_z, rect.width(), rect.height(), aspect);

                zoom.set(new_z);
                pan_x.set(px);
                pan_y.set(py);
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                drag_start_x.set(client.x);
                drag_start_y.set(client.y);
                drag_start_pan_x.set(*pan_x.read());
                drag_start_pan_y.set(*pan_y.read());
            },

            onmousemove: move |evt: Event<MouseData>| {
                let client = evt.client_coordinates();
                if *is_dragging.read() {
                    let dx = client.x - *drag_start_x.read();
                    let dy = client.y - *drag_start_y.read();
                    let past_threshold = dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD;
                    if !*did_drag.read() && past_threshold {
                        did_drag.set(true);
                        hovered.set(None);
                    }
                    if *did_drag.read() {
                        if let Some(rect) = container_rect() {
                            let (px, py) = clamp_pan(
                                *drag_start_pan_x.read() + dx,
                                *drag_start_pan_y.read() + dy,
                                *zoom.read(),
                                rect.width(),
                                rect.height(),
                                aspect,
                            );
                            pan_x.set(px);
                            pan_y.set(py);
                        }
                        return;
                    }
                }

                if let Some(rect) = container_rect() {
                    cursor.set((client.x - rect.left(), client.y - rect.top()));
                }
                let under = hit(client.x, client.y);
                if *hovered.peek() != under {
                    hovered.set(under);
                }
            },

            onmouseup: move |evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                is_dragging.set(false);

                // A mouseup without drag movement is a click
                if was_dragging && !was_drag {
                    let client = evt.client_coordinates();
                    if let Some(id) = hit(client.x, client.y) {
                        session.write().toggle(&id);
                    }
                }
            },

            onmouseleave: move |_| {
                is_dragging.set(false);
                hovered.set(None);
            },

            div {
                class: "map-inner",
                style: "{transform_style}",
                div { dangerous_inner_html: "{svg_html}" }
            }

            if let Some(text) = tooltip {
                div {
                    class: "map-tooltip",
                    style: "left: {tip_left}px; top: {tip_top}px;",
                    "{text}"
                }
            }

            button {
                class: "reset-view secondary",
                onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                onclick: move |_| {
                    zoom.set(1.0);
                    pan_x.set(0.0);
                    pan_y.set(0.0);
                },
                "Reset view"
            }
        }
    }
}
