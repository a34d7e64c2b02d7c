use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::state::{
	BUBBLE_FILL, BUBBLE_OPACITY, BubbleChartState, LegendBlock, NON_EXIT_FILTER, NodeIcon, TitleBlock,
};

const LABEL_FONT: &str = "14pt sans-serif";
const TITLE_FONT: &str = "18pt sans-serif";
const PUBLISHED_FONT: &str = "10pt sans-serif";
const LEGEND_FONT: &str = "16px sans-serif";
const TEXT_FILL: &str = "#000000";
const LEGEND_FILL: &str = "#cccccc";
const LEGEND_STROKE: &str = "#000000";

/// The two relay icons, shared by the chart and the legend.
pub struct IconImages {
	pub onion: HtmlImageElement,
	pub circle: HtmlImageElement,
}

impl IconImages {
	pub fn get(&self, icon: NodeIcon) -> &HtmlImageElement {
		match icon {
			NodeIcon::Onion => &self.onion,
			NodeIcon::Circle => &self.circle,
		}
	}
}

pub fn render(state: &BubbleChartState, icons: &IconImages, ctx: &CanvasRenderingContext2d) {
	let d = state.scene.diameter;
	ctx.clear_rect(0.0, 0.0, d, d);
	draw_bubbles(state, ctx);
	draw_relays(state, icons, ctx);
	draw_title(&state.scene.title, ctx);
	draw_legend(&state.scene.legend, icons, ctx);
	draw_label(state, ctx);
}

fn draw_bubbles(state: &BubbleChartState, ctx: &CanvasRenderingContext2d) {
	ctx.set_global_alpha(BUBBLE_OPACITY);
	ctx.set_fill_style_str(BUBBLE_FILL);
	for bubble in &state.scene.bubbles {
		ctx.begin_path();
		let _ = ctx.arc(bubble.x, bubble.y, bubble.r, 0.0, 2.0 * PI);
		ctx.fill();
	}
	ctx.set_global_alpha(1.0);
}

fn draw_relays(state: &BubbleChartState, icons: &IconImages, ctx: &CanvasRenderingContext2d) {
	for relay in &state.scene.icons {
		if relay.hue_shift {
			set_filter(ctx, NON_EXIT_FILTER);
		}
		let size = relay.r * 2.0;
		draw_icon(
			ctx,
			icons.get(relay.icon),
			relay.x - relay.r,
			relay.y - relay.r,
			size,
			size,
		);
		if relay.hue_shift {
			set_filter(ctx, "none");
		}
	}
}

// `filter` goes through Reflect: older web-sys releases do not bind it.
fn set_filter(ctx: &CanvasRenderingContext2d, filter: &str) {
	let _ = js_sys::Reflect::set(ctx, &JsValue::from_str("filter"), &JsValue::from_str(filter));
}

/// Fit the image into the box keeping its aspect ratio, centred horizontally
/// and aligned to the top.
fn draw_icon(ctx: &CanvasRenderingContext2d, img: &HtmlImageElement, x: f64, y: f64, w: f64, h: f64) {
	let (nw, nh) = (img.natural_width() as f64, img.natural_height() as f64);
	if !img.complete() || nw == 0.0 || nh == 0.0 {
		return;
	}
	let scale = (w / nw).min(h / nh);
	let (dw, dh) = (nw * scale, nh * scale);
	let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(img, x + (w - dw) / 2.0, y, dw, dh);
}

fn draw_title(title: &TitleBlock, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(TEXT_FILL);
	ctx.set_text_align("center");
	ctx.set_font(TITLE_FONT);
	let _ = ctx.fill_text(&title.title, title.x, title.y);
	ctx.set_font(PUBLISHED_FONT);
	let _ = ctx.fill_text(&title.published, title.x, title.y + title.published_dy);
}

fn draw_legend(legend: &LegendBlock, icons: &IconImages, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(LEGEND_FILL);
	ctx.fill_rect(legend.x, legend.y, legend.width, legend.height);
	ctx.set_stroke_style_str(LEGEND_STROKE);
	ctx.set_line_width(1.0);
	ctx.stroke_rect(legend.x, legend.y, legend.width, legend.height);

	ctx.set_fill_style_str(TEXT_FILL);
	ctx.set_text_align("start");
	ctx.set_font(LEGEND_FONT);
	for row in &legend.rows {
		let top = legend.y + row.y;
		draw_icon(ctx, icons.get(row.icon), legend.x, top, legend.icon_size, legend.icon_size);
		let _ = ctx.fill_text(
			&row.text,
			legend.x + legend.icon_size,
			top + legend.icon_size / 2.0,
		);
	}
}

fn draw_label(state: &BubbleChartState, ctx: &CanvasRenderingContext2d) {
	let Some(target) = state.hovered() else {
		return;
	};
	let (x, y) = target.label_anchor();
	ctx.set_fill_style_str(TEXT_FILL);
	ctx.set_text_align("center");
	ctx.set_font(LABEL_FONT);
	let _ = ctx.fill_text(&target.label, x, y);
}
