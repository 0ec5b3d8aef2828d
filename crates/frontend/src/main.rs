mod api;
mod components;
mod coords;
mod pages;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/forecast/:date")]
    ForecastDay { date: String },
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::forecast_entry::ForecastEntry { date: None::<String> }
    }
}

#[component]
fn ForecastDay(date: String) -> Element {
    rsx! {
        pages::forecast_entry::ForecastEntry { date: Some(date) }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
