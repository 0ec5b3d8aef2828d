use rainmap_shared::feature::AreaFeature;

/// Width of the SVG viewBox; the height follows the map's aspect ratio.
pub const VIEW_WIDTH: f64 = 1000.0;

/// Equirectangular projection of a lon/lat box onto the SVG viewBox.
///
/// Longitudes are shrunk by the cosine of the middle latitude so shapes keep
/// roughly their true proportions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    min_lon: f64,
    max_lat: f64,
    x_scale: f64,
    y_scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Projection {
    /// Fit `(min_lon, min_lat, max_lon, max_lat)` into a viewBox `width` wide.
    pub fn fit(bounds: (f64, f64, f64, f64), width: f64) -> Option<Self> {
        let (min_lon, min_lat, max_lon, max_lat) = bounds;
        let lon_span = max_lon - min_lon;
        let lat_span = max_lat - min_lat;
        if width <= 0.0 || lon_span <= 0.0 || lat_span <= 0.0 {
            return None;
        }
        let mid_lat = ((min_lat + max_lat) / 2.0).to_radians();
        let x_scale = width / lon_span;
        let y_scale = x_scale / mid_lat.cos().max(0.1);
        Some(Projection {
            min_lon,
            max_lat,
            x_scale,
            y_scale,
            width,
            height: lat_span * y_scale,
        })
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (lon - self.min_lon) * self.x_scale,
            (self.max_lat - lat) * self.y_scale,
        )
    }

    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.min_lon + x / self.x_scale,
            self.max_lat - y / self.y_scale,
        )
    }

    /// SVG path data for every ring of a feature, one closed subpath each.
    pub fn feature_path(&self, feature: &AreaFeature) -> String {
        let mut d = String::new();
        for ring in &feature.rings {
            for (i, &(lon, lat)) in ring.iter().enumerate() {
                let (x, y) = self.project(lon, lat);
                let cmd = if i == 0 { 'M' } else { 'L' };
                d.push_str(&format!("{cmd}{x:.2} {y:.2}"));
            }
            if !ring.is_empty() {
                d.push('Z');
            }
        }
        d
    }
}

/// Convert container-relative coordinates to viewBox coordinates, undoing the
/// zoom/pan CSS transform.
///
/// The SVG renders at `width: 100%` with its aspect ratio kept, so both axes
/// share the scale `view_width / container_w`.
pub fn container_to_view(
    container_x: f64,
    container_y: f64,
    container_w: f64,
    view_width: f64,
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
) -> Option<(f64, f64)> {
    if container_w <= 0.0 || zoom <= 0.0 {
        return None;
    }
    let rendered_x = (container_x - pan_x) / zoom;
    let rendered_y = (container_y - pan_y) / zoom;
    let scale = view_width / container_w;
    Some((rendered_x * scale, rendered_y * scale))
}

/// Container-relative position of a client point.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    container_id: &str,
) -> Option<(f64, f64, f64)> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(container_id)?;
    let rect = element.get_bounding_client_rect();
    Some((client_x - rect.left(), client_y - rect.top(), rect.width()))
}
