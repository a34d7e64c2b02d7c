use log::{debug, info};

use super::grouping::{Leaf, group_relays};
use super::pack::{PackLayout, PackNode};
use super::types::RelayDocument;
use crate::config::ChartConfig;
use crate::error::Result;

/// Hover labels show at most this many characters of a group name.
pub const LABEL_MAX_CHARS: usize = 50;

/// Relays drawn with a radius at or below this are too small to see.
pub const MIN_ICON_RADIUS: f64 = 1.0;

pub const BUBBLE_FILL: &str = "#888888";
pub const BUBBLE_OPACITY: f64 = 0.25;
pub const NON_EXIT_FILTER: &str = "hue-rotate(90deg)";

const LEGEND_WIDTH: f64 = 270.0;
const LEGEND_HEIGHT: f64 = 115.0;
const LEGEND_ICON_SIZE: f64 = 50.0;
const LEGEND_INSET: f64 = 10.0;
const TITLE_BOTTOM_OFFSET: f64 = 30.0;
const PUBLISHED_DY: f64 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeIcon {
	Onion,
	Circle,
}

impl NodeIcon {
	pub fn asset(self, base: &str) -> String {
		match self {
			Self::Onion => format!("{base}-onion.svg"),
			Self::Circle => format!("{base}-circle.svg"),
		}
	}
}

/// Relays advertising at least `cutoff` bytes/s get the onion icon.
pub fn select_icon(bandwidth: f64, cutoff: f64) -> NodeIcon {
	if bandwidth >= cutoff {
		NodeIcon::Onion
	} else {
		NodeIcon::Circle
	}
}

pub fn truncate_label(name: &str) -> String {
	name.chars().take(LABEL_MAX_CHARS).collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupBubble {
	pub x: f64,
	pub y: f64,
	pub r: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelayIcon {
	pub fingerprint: String,
	pub x: f64,
	pub y: f64,
	pub r: f64,
	pub icon: NodeIcon,
	/// Non-exit relays are drawn hue-shifted.
	pub hue_shift: bool,
}

/// Hover area of one group, with the label it reveals.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverTarget {
	pub x: f64,
	pub y: f64,
	pub r: f64,
	pub label: String,
}

impl HoverTarget {
	pub fn contains(&self, x: f64, y: f64) -> bool {
		let (dx, dy) = (x - self.x, y - self.y);
		dx * dx + dy * dy <= self.r * self.r
	}

	/// Anchor of the label: centred on the top of the bubble.
	pub fn label_anchor(&self) -> (f64, f64) {
		(self.x, self.y - self.r)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct TitleBlock {
	pub x: f64,
	pub y: f64,
	pub title: String,
	pub published: String,
	pub published_dy: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendRow {
	/// Offset of the row inside the legend box.
	pub y: f64,
	pub icon: NodeIcon,
	pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendBlock {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
	pub icon_size: f64,
	pub rows: [LegendRow; 2],
}

impl LegendBlock {
	fn new(diameter: f64, cutoff_mbits: f64) -> Self {
		let margin = (LEGEND_HEIGHT - LEGEND_ICON_SIZE * 2.0) / 3.0;
		Self {
			x: diameter - LEGEND_WIDTH - LEGEND_INSET,
			y: diameter - LEGEND_HEIGHT - LEGEND_INSET,
			width: LEGEND_WIDTH,
			height: LEGEND_HEIGHT,
			icon_size: LEGEND_ICON_SIZE,
			rows: [
				LegendRow {
					y: margin,
					icon: NodeIcon::Onion,
					text: format!("relays with at least {cutoff_mbits} Mbit/s of capacity"),
				},
				LegendRow {
					y: LEGEND_ICON_SIZE + margin * 2.0,
					icon: NodeIcon::Circle,
					text: "smaller relays".to_string(),
				},
			],
		}
	}
}

/// Everything drawn for one document, resolved to canvas coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
	pub diameter: f64,
	pub bubbles: Vec<GroupBubble>,
	pub icons: Vec<RelayIcon>,
	pub targets: Vec<HoverTarget>,
	pub title: TitleBlock,
	pub legend: LegendBlock,
}

enum NodeData<'a> {
	Root,
	Group(&'a str),
	Relay(&'a Leaf),
}

impl Scene {
	pub fn build(document: &RelayDocument, config: &ChartConfig) -> Result<Self> {
		let groups = group_relays(&document.relays, &config.grouping, config.exits_only)?;

		let root = PackNode::branch(
			NodeData::Root,
			groups
				.iter()
				.map(|group| {
					PackNode::branch(
						NodeData::Group(group.name.as_str()),
						group
							.children
							.iter()
							.map(|leaf| PackNode::leaf(NodeData::Relay(leaf), leaf.value))
							.collect(),
					)
				})
				.collect(),
		);
		let layout = PackLayout::new(config.diameter, config.diameter, config.padding);
		let nodes = layout.nodes(&root);
		debug!("layout produced {} nodes", nodes.len());

		let mut bubbles = Vec::new();
		let mut icons = Vec::new();
		let mut targets = Vec::new();
		for node in &nodes {
			let c = node.circle;
			match node.data {
				NodeData::Group(name) if node.has_children && !name.is_empty() => {
					bubbles.push(GroupBubble { x: c.x, y: c.y, r: c.r });
					targets.push(HoverTarget {
						x: c.x,
						y: c.y,
						r: c.r,
						label: truncate_label(name),
					});
				}
				NodeData::Relay(leaf) if c.r > MIN_ICON_RADIUS => icons.push(RelayIcon {
					fingerprint: leaf.fingerprint.clone(),
					x: c.x,
					y: c.y,
					r: c.r,
					icon: select_icon(leaf.bandwidth, config.bandwidth_cutoff),
					hue_shift: !leaf.exit,
				}),
				_ => {}
			}
		}
		info!(
			"scene: {} groups, {} of {} relays drawn",
			bubbles.len(),
			icons.len(),
			groups.iter().map(|g| g.children.len()).sum::<usize>()
		);

		let d = config.diameter;
		Ok(Self {
			diameter: d,
			bubbles,
			icons,
			targets,
			title: TitleBlock {
				x: d / 3.0,
				y: d - TITLE_BOTTOM_OFFSET,
				title: config.title.clone(),
				published: document.relays_published.clone(),
				published_dy: PUBLISHED_DY,
			},
			legend: LegendBlock::new(d, config.cutoff_mbits()),
		})
	}
}

/// A built scene plus the pointer state of the canvas showing it.
pub struct BubbleChartState {
	pub scene: Scene,
	pub hover: Option<usize>,
}

impl BubbleChartState {
	pub fn new(document: &RelayDocument, config: &ChartConfig) -> Result<Self> {
		Ok(Self {
			scene: Scene::build(document, config)?,
			hover: None,
		})
	}

	/// Index of the hover target under `(x, y)`; the last drawn wins.
	pub fn target_at(&self, x: f64, y: f64) -> Option<usize> {
		self.scene.targets.iter().rposition(|t| t.contains(x, y))
	}

	/// Returns whether the visible label changed.
	pub fn set_hover(&mut self, target: Option<usize>) -> bool {
		if self.hover == target {
			return false;
		}
		self.hover = target;
		true
	}

	pub fn hovered(&self) -> Option<&HoverTarget> {
		self.hover.and_then(|i| self.scene.targets.get(i))
	}
}
