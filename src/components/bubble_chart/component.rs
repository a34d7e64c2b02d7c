use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use log::{error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent};

use super::render::{self, IconImages};
use super::state::{BubbleChartState, NodeIcon};
use super::types::RelayDocument;
use crate::config::ChartConfig;
use crate::error::{ChartError, Result};

struct MountedChart {
	state: BubbleChartState,
	icons: IconImages,
	ctx: CanvasRenderingContext2d,
}

impl MountedChart {
	fn redraw(&self) {
		render::render(&self.state, &self.icons, &self.ctx);
	}
}

fn icon_image(asset: &str) -> Result<HtmlImageElement> {
	let img = HtmlImageElement::new()
		.map_err(|e| ChartError::Canvas(format!("cannot create image: {e:?}")))?;
	img.set_src(asset);
	Ok(img)
}

fn mount(
	canvas: &HtmlCanvasElement,
	document: &RelayDocument,
	config: &ChartConfig,
) -> Result<MountedChart> {
	canvas.set_width(config.diameter as u32);
	canvas.set_height(config.diameter as u32);
	let ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")
		.map_err(|e| ChartError::Canvas(format!("{e:?}")))?
		.ok_or_else(|| ChartError::Canvas("no 2d context".to_string()))?
		.dyn_into()
		.map_err(|_| ChartError::Canvas("2d context has an unexpected type".to_string()))?;
	let icons = IconImages {
		onion: icon_image(&NodeIcon::Onion.asset(&config.icon_base))?,
		circle: icon_image(&NodeIcon::Circle.asset(&config.icon_base))?,
	};
	Ok(MountedChart {
		state: BubbleChartState::new(document, config)?,
		icons,
		ctx,
	})
}

/// Pointer position in canvas units, allowing for CSS scaling of the element.
fn canvas_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	let sx = if rect.width() > 0.0 {
		canvas.width() as f64 / rect.width()
	} else {
		1.0
	};
	let sy = if rect.height() > 0.0 {
		canvas.height() as f64 / rect.height()
	} else {
		1.0
	};
	(
		(ev.client_x() as f64 - rect.left()) * sx,
		(ev.client_y() as f64 - rect.top()) * sy,
	)
}

/// Canvas chart of `document`. When the chart cannot be mounted the reason is
/// logged and passed to `on_failure`.
#[component]
pub fn BubbleChart(
	document: Arc<RelayDocument>,
	config: ChartConfig,
	on_failure: Callback<String>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let chart: Rc<RefCell<Option<MountedChart>>> = Rc::new(RefCell::new(None));
	let image_cbs: Rc<RefCell<Vec<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(Vec::new()));
	let (chart_init, image_cbs_init) = (chart.clone(), image_cbs.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if chart_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let mounted = match mount(&canvas, &document, &config) {
			Ok(mounted) => mounted,
			Err(e) => {
				error!("{e}");
				on_failure.run(e.to_string());
				return;
			}
		};
		mounted.redraw();
		*chart_init.borrow_mut() = Some(mounted);

		// Icons decode asynchronously; redraw once each arrives.
		let chart_load = chart_init.clone();
		let on_load = Closure::<dyn FnMut()>::new(move || {
			if let Some(ref c) = *chart_load.borrow() {
				c.redraw();
			}
		});
		let on_error = Closure::<dyn FnMut()>::new(move || {
			warn!("relay icon failed to load; drawing bubbles only");
		});
		if let Some(ref c) = *chart_init.borrow() {
			for img in [&c.icons.onion, &c.icons.circle] {
				img.set_onload(Some(on_load.as_ref().unchecked_ref()));
				img.set_onerror(Some(on_error.as_ref().unchecked_ref()));
			}
		}
		image_cbs_init.borrow_mut().extend([on_load, on_error]);
	});

	let chart_mm = chart.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (x, y) = canvas_point(&canvas, &ev);
		if let Some(ref mut c) = *chart_mm.borrow_mut() {
			let target = c.state.target_at(x, y);
			if c.state.set_hover(target) {
				c.redraw();
			}
		}
	};

	let chart_ml = chart.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut c) = *chart_ml.borrow_mut() {
			if c.state.set_hover(None) {
				c.redraw();
			}
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="bubble-chart"
			on:mousemove=on_mousemove
			on:mouseleave=on_mouseleave
			style="display: block;"
		/>
	}
}
