use dioxus::prelude::*;
use rainmap_shared::models::parse_date;
use rainmap_shared::style::Granularity;

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn granularity_label(g: Granularity) -> &'static str {
    match g {
        Granularity::Both => "Districts + states",
        Granularity::Districts => "Districts only",
        Granularity::States => "States only",
    }
}

#[component]
pub fn DatePanel(
    selected_date: Signal<String>,
    granularity: Signal<Granularity>,
    recent_dates: Vec<String>,
    saving: bool,
    on_save: EventHandler<()>,
) -> Element {
    let current = selected_date.read().clone();
    let valid = parse_date(&current).is_some();

    rsx! {
        div { class: "panel",
            h3 { "Forecast date" }
            div { class: "date-row",
                input {
                    r#type: "date",
                    value: "{current}",
                    onchange: move |evt: Event<FormData>| {
                        let value = evt.value();
                        if parse_date(&value).is_some() {
                            selected_date.set(value);
                        }
                    },
                }
                button {
                    class: "secondary",
                    onclick: move |_| selected_date.set(today()),
                    "Today"
                }
            }
            if !recent_dates.is_empty() {
                div { class: "recent-dates",
                    span { "Saved: " }
                    for date in recent_dates.iter().cloned() {
                        button {
                            class: if date == current { "link active" } else { "link" },
                            onclick: {
                                let date = date.clone();
                                move |_| selected_date.set(date.clone())
                            },
                            "{date}"
                        }
                    }
                }
            }
            div { class: "layer-row",
                label { "Show:" }
                select {
                    onchange: move |evt: Event<FormData>| {
                        if let Ok(g) = evt.value().parse::<Granularity>() {
                            granularity.set(g);
                        }
                    },
                    for g in Granularity::ALL {
                        option {
                            value: "{g.value()}",
                            selected: *granularity.read() == g,
                            "{granularity_label(g)}"
                        }
                    }
                }
            }
            div { class: "button-row",
                button {
                    disabled: !valid || saving,
                    onclick: move |_| on_save.call(()),
                    if saving { "Saving..." } else { "Save forecast" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_is_a_valid_date() {
        assert!(parse_date(&today()).is_some());
    }

    #[test]
    fn test_every_granularity_has_a_label() {
        for g in Granularity::ALL {
            assert!(!granularity_label(g).is_empty());
        }
    }
}
