use dioxus::prelude::*;
use rainmap_shared::models::RainfallCategory;
use rainmap_shared::session::ForecastSession;

/// Parse the optional rainfall field: blank means "leave rainfall alone".
pub fn parse_rainfall(input: &str) -> Result<Option<f64>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<f64>() {
        Ok(mm) if mm.is_finite() && mm >= 0.0 => Ok(Some(mm)),
        _ => Err(format!("Rainfall must be a non-negative number of mm, got '{}'", input)),
    }
}

#[component]
pub fn CategoryPanel(
    session: Signal<ForecastSession>,
    category: Signal<Option<RainfallCategory>>,
    rainfall: Signal<String>,
    on_error: EventHandler<String>,
) -> Element {
    let current = *category.read();
    let can_apply = session.read().can_apply(current);
    let has_selection = !session.read().selection().is_empty();

    rsx! {
        div { class: "panel",
            h3 { "Category" }
            select {
                onchange: move |evt: Event<FormData>| {
                    category.set(evt.value().parse::<RainfallCategory>().ok());
                },
                option { value: "", selected: current.is_none(), "-- choose --" }
                for c in RainfallCategory::ALL {
                    option {
                        value: "{c.code()}",
                        selected: current == Some(c),
                        "{c.code()} ({c.description()})"
                    }
                }
            }
            div { class: "rainfall-row",
                label { "Rainfall (mm):" }
                input {
                    r#type: "number",
                    min: "0",
                    step: "0.1",
                    placeholder: "optional",
                    value: "{rainfall}",
                    oninput: move |evt: Event<FormData>| rainfall.set(evt.value()),
                }
            }
            div { class: "button-row",
                button {
                    disabled: !can_apply,
                    onclick: move |_| {
                        let Some(c) = *category.read() else { return };
                        let mm = match parse_rainfall(&rainfall.read()) {
                            Ok(mm) => mm,
                            Err(e) => {
                                on_error.call(e);
                                return;
                            }
                        };
                        let mut s = session.write();
                        s.apply_category(c);
                        if mm.is_some() {
                            s.apply_rainfall(mm);
                        }
                    },
                    "Apply"
                }
                button {
                    class: "secondary",
                    disabled: !has_selection,
                    onclick: move |_| session.write().clear_selection(),
                    "Clear"
                }
            }
        }
    }
}
