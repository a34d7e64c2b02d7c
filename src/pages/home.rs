use std::sync::Arc;

use leptos::prelude::*;
use leptos_meta::Title;
use log::error;
use web_sys::UrlSearchParams;

use crate::components::bubble_chart::{BubbleChart, RelayDocument};
use crate::config::ChartConfig;
use crate::loader::load_document;

/// Chart settings from the page's query string.
fn page_config() -> ChartConfig {
	let params = web_sys::window()
		.and_then(|w| w.location().search().ok())
		.and_then(|search| UrlSearchParams::new_with_str(&search).ok());
	ChartConfig::from_query(|name| params.as_ref().and_then(|p| p.get(name)))
}

/// Loads the relay document once and shows the chart, or the reason it could not
/// be drawn.
#[component]
pub fn Home() -> impl IntoView {
	let config = page_config();
	let loaded: RwSignal<Option<Result<Arc<RelayDocument>, String>>> = RwSignal::new(None);

	let url = config.data_url.clone();
	leptos::task::spawn_local(async move {
		let result = load_document(&url).await.map(Arc::new).map_err(|e| {
			error!("{e}");
			e.to_string()
		});
		loaded.set(Some(result));
	});

	let on_failure = Callback::new(move |message: String| loaded.set(Some(Err(message))));

	let title = config.title.clone();
	view! {
		<Title text=title />
		<div class="bubble-page">
			{move || match loaded.get() {
				None => view! { <p class="status">"Loading relay data…"</p> }.into_any(),
				Some(Ok(document)) => {
					view! {
						<BubbleChart document=document config=config.clone() on_failure=on_failure />
					}
						.into_any()
				}
				Some(Err(message)) => {
					view! {
						<h1>"Uh oh! The chart could not be drawn."</h1>
						<p class="error">{message}</p>
					}
						.into_any()
				}
			}}
		</div>
	}
}
