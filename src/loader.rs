//! Fetches and validates the relay document.

use log::info;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::components::bubble_chart::RelayDocument;
use crate::error::{ChartError, Result};

/// The document may be served from another origin than the page, such as the
/// public relay search service.
const FETCH_MODE: RequestMode = RequestMode::Cors;

fn js_message(value: &JsValue) -> String {
	value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

async fn await_promise(url: &str, promise: js_sys::Promise) -> Result<JsValue> {
	JsFuture::from(promise).await.map_err(|e| ChartError::Fetch {
		url: url.to_string(),
		message: js_message(&e),
	})
}

/// Load the document at `url`. Any failure aborts the render pass.
pub async fn load_document(url: &str) -> Result<RelayDocument> {
	let fetch_error = |e: JsValue| ChartError::Fetch {
		url: url.to_string(),
		message: js_message(&e),
	};
	let window = web_sys::window().ok_or_else(|| ChartError::Fetch {
		url: url.to_string(),
		message: "no window".to_string(),
	})?;

	let opts = RequestInit::new();
	opts.set_method("GET");
	opts.set_mode(FETCH_MODE);
	let request = Request::new_with_str_and_init(url, &opts).map_err(fetch_error)?;

	let response: Response = await_promise(url, window.fetch_with_request(&request))
		.await?
		.dyn_into()
		.map_err(fetch_error)?;
	if !response.ok() {
		return Err(ChartError::Status {
			url: url.to_string(),
			status: response.status(),
			status_text: response.status_text(),
		});
	}

	let body = await_promise(url, response.text().map_err(fetch_error)?).await?;
	let body = body.as_string().ok_or_else(|| ChartError::Fetch {
		url: url.to_string(),
		message: "response body is not text".to_string(),
	})?;

	let document = RelayDocument::from_json(&body)?;
	info!(
		"loaded {} relays published {}",
		document.relays.len(),
		document.relays_published
	);
	Ok(document)
}
