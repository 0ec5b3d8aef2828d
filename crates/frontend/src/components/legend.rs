use dioxus::prelude::*;
use rainmap_shared::session::ForecastSession;
use rainmap_shared::style;

#[component]
pub fn Legend(session: Signal<ForecastSession>) -> Element {
    let legend = style::Legend::from_session(&session.read());
    let selected = legend.selected_label();

    rsx! {
        div { class: "panel legend",
            h3 { "Legend" }
            for entry in legend.entries {
                div { class: "legend-row",
                    span {
                        class: "swatch",
                        style: "background: {entry.color};",
                    }
                    span { class: "legend-code", "{entry.category}" }
                    span { class: "legend-desc", "{entry.category.description()}" }
                    span { class: "legend-count", "{entry.count}" }
                }
            }
            div { class: "legend-selected",
                strong { "Selected: " }
                span { "{selected}" }
            }
        }
    }
}
