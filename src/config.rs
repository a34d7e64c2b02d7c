//! Chart configuration.
//!
//! Pages pick their grouping, title and filters through URL query parameters;
//! anything absent keeps the default below.

use log::warn;

use crate::components::bubble_chart::Grouping;

/// 100 Mbit/s in bytes per second.
pub const DEFAULT_BANDWIDTH_CUTOFF: f64 = 100.0 / 8.0 * 1000.0 * 1000.0;

const MIN_DIAMETER: f64 = 100.0;
const MAX_DIAMETER: f64 = 10_000.0;

/// Everything one render pass needs to know besides the data itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartConfig {
	/// Side length of the square canvas.
	pub diameter: f64,
	pub title: String,
	/// Leave out relays with zero exit probability.
	pub exits_only: bool,
	pub grouping: Grouping,
	/// Gap kept between sibling circles.
	pub padding: f64,
	/// Advertised bandwidth (bytes/s) at which a relay gets the large icon.
	pub bandwidth_cutoff: f64,
	pub data_url: String,
	/// Icon assets are `<icon_base>-onion.svg` and `<icon_base>-circle.svg`.
	pub icon_base: String,
}

impl Default for ChartConfig {
	fn default() -> Self {
		Self {
			diameter: 800.0,
			title: "Tor relays".to_string(),
			exits_only: false,
			grouping: Grouping::Country,
			padding: 1.5,
			bandwidth_cutoff: DEFAULT_BANDWIDTH_CUTOFF,
			data_url: "details.json".to_string(),
			icon_base: "tor-consensus-vis-node".to_string(),
		}
	}
}

impl ChartConfig {
	/// Build a config from query parameters looked up by name.
	pub fn from_query(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();

		if let Some(raw) = lookup("diameter") {
			match raw.trim().parse::<f64>() {
				Ok(d) if d.is_finite() => config.diameter = d.clamp(MIN_DIAMETER, MAX_DIAMETER),
				_ => warn!("ignoring diameter {raw:?}"),
			}
		}
		if let Some(title) = lookup("title").filter(|t| !t.trim().is_empty()) {
			config.title = title;
		}
		if let Some(raw) = lookup("exits_only") {
			match parse_flag(&raw) {
				Some(flag) => config.exits_only = flag,
				None => warn!("ignoring exits_only {raw:?}"),
			}
		}
		if let Some(raw) = lookup("grouping") {
			match Grouping::parse(&raw) {
				Some(grouping) => config.grouping = grouping,
				None => warn!("unknown grouping {raw:?}, keeping {:?}", config.grouping),
			}
		}
		if let Some(url) = lookup("data").filter(|u| !u.trim().is_empty()) {
			config.data_url = url;
		}
		config
	}

	/// Legend label for the large icon, e.g. "100" for the default cutoff.
	pub fn cutoff_mbits(&self) -> f64 {
		self.bandwidth_cutoff * 8.0 / 1000.0 / 1000.0
	}
}

fn parse_flag(raw: &str) -> Option<bool> {
	match raw.trim().to_lowercase().as_str() {
		"" | "1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}
