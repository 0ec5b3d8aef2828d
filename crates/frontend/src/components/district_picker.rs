use dioxus::prelude::*;
use rainmap_shared::feature::AreaCatalog;
use rainmap_shared::models::AreaLevel;

/// Districts with geometry as `(id, name)`, sorted by name.
pub fn district_choices(catalog: &AreaCatalog) -> Vec<(String, String)> {
    let mut choices: Vec<(String, String)> = catalog
        .of_level(AreaLevel::District)
        .filter(|f| f.bounds().is_some())
        .map(|f| (f.id.clone(), f.name.clone()))
        .collect();
    choices.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    choices
}

#[component]
pub fn DistrictPicker(catalog: Signal<AreaCatalog>, focus: Signal<Option<String>>) -> Element {
    let choices = use_memo(move || district_choices(&catalog.read()));
    let mut picked = use_signal(String::new);
    let nothing_picked = picked.read().is_empty();

    rsx! {
        div { class: "panel",
            h3 { "Find district" }
            select {
                value: "{picked}",
                onchange: move |evt: Event<FormData>| picked.set(evt.value()),
                option { value: "", "Choose a district" }
                for (id, name) in choices.read().iter() {
                    option { key: "{id}", value: "{id}", "{name}" }
                }
            }
            div { class: "button-row",
                button {
                    class: "secondary",
                    disabled: nothing_picked,
                    onclick: move |_| {
                        let id = picked.read().clone();
                        if !id.is_empty() {
                            focus.set(Some(id));
                        }
                    },
                    "Zoom to district"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choices_sorted_by_name_and_skip_states() {
        let catalog = AreaCatalog::from_geojson_str(
            r#"[
                {"type": "Feature", "properties": {"DIST_ID": 1, "DIST_NAME": "Purulia"},
                 "geometry": {"type": "Polygon", "coordinates": [[[86,22],[87,22],[87,23],[86,22]]]}},
                {"type": "Feature", "properties": {"DIST_ID": 2, "DIST_NAME": "Bankura"},
                 "geometry": {"type": "Polygon", "coordinates": [[[87,22],[88,22],[88,23],[87,22]]]}},
                {"type": "Feature", "properties": {"DIST_ID": 3, "DIST_NAME": "Nowhere"}, "geometry": null},
                {"type": "Feature", "properties": {"STATE_CODE": "WB", "STATE_NAME": "West Bengal"},
                 "geometry": {"type": "Polygon", "coordinates": [[[86,22],[88,22],[88,23],[86,22]]]}}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            district_choices(&catalog),
            vec![
                ("D_2".to_string(), "Bankura".to_string()),
                ("D_1".to_string(), "Purulia".to_string()),
            ]
        );
    }
}
