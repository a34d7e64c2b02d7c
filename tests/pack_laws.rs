//! Property tests for the circle packing layout.
//!
//! 1. Sibling circles never overlap.
//! 2. Every circle stays inside its parent, and so inside the canvas.
//! 3. Leaf areas are proportional to their values; zero-weight leaves have
//!    no area.
//!
//! Weights mix zeros, small counts and consensus-sized values so siblings
//! several orders of magnitude apart get packed together.

use consensus_bubbles::components::bubble_chart::pack::{Circle, PackLayout, PackNode, PositionedNode};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const SIDE: f64 = 800.0;

fn weight_strategy() -> impl Strategy<Value = u32> {
	prop_oneof![Just(0u32), 1u32..10, 1u32..2_000_000_000]
}

fn tree_strategy() -> impl Strategy<Value = PackNode<()>> {
	prop::collection::vec(prop::collection::vec(weight_strategy(), 1..25), 1..12).prop_map(|groups| {
		PackNode::branch(
			(),
			groups
				.into_iter()
				.map(|leaves| {
					PackNode::branch(
						(),
						leaves
							.into_iter()
							.map(|v| PackNode::leaf((), v as f64))
							.collect(),
					)
				})
				.collect(),
		)
	})
}

fn distance(a: Circle, b: Circle) -> f64 {
	((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn layout(root: &PackNode<()>) -> Vec<PositionedNode<'_, ()>> {
	PackLayout::new(SIDE, SIDE, 1.5).nodes(root)
}

proptest! {
	#[test]
	fn siblings_do_not_overlap(root in tree_strategy()) {
		let nodes = layout(&root);
		for (i, a) in nodes.iter().enumerate() {
			for b in &nodes[i + 1..] {
				if a.parent.is_some() && a.parent == b.parent {
					let gap = distance(a.circle, b.circle) - a.circle.r - b.circle.r;
					prop_assert!(gap > -1e-6, "siblings overlap by {}", -gap);
				}
			}
		}
	}
}

proptest! {
	#[test]
	fn circles_stay_inside_parent_and_canvas(root in tree_strategy()) {
		let nodes = layout(&root);
		let canvas = Circle::new(SIDE / 2.0, SIDE / 2.0, SIDE / 2.0);
		if nodes[0].value > 0.0 {
			prop_assert_eq!(nodes[0].circle, canvas);
		} else {
			prop_assert_eq!(nodes[0].circle, Circle::new(SIDE / 2.0, SIDE / 2.0, 0.0));
		}
		for node in &nodes[1..] {
			let parent = nodes[node.parent.unwrap()].circle;
			let c = node.circle;
			prop_assert!(distance(parent, c) + c.r <= parent.r + 1e-6);
			prop_assert!(c.x - c.r >= -1e-6 && c.x + c.r <= SIDE + 1e-6);
			prop_assert!(c.y - c.r >= -1e-6 && c.y + c.r <= SIDE + 1e-6);
		}
	}
}

proptest! {
	#[test]
	fn leaf_area_tracks_value(root in tree_strategy()) {
		let nodes = layout(&root);
		let (weighted, empty): (Vec<_>, Vec<_>) = nodes
			.iter()
			.filter(|n| !n.has_children)
			.partition(|n| n.value > 0.0);
		for leaf in &empty {
			prop_assert_eq!(leaf.circle.r, 0.0);
		}
		let Some(first) = weighted.first() else {
			return Ok(());
		};
		let ratio = first.circle.r.powi(2) / first.value;
		for leaf in &weighted {
			let r = leaf.circle.r.powi(2) / leaf.value;
			prop_assert!((r - ratio).abs() <= 1e-6 * ratio, "area ratio {} against {}", r, ratio);
		}
	}
}

proptest! {
	#[test]
	fn interior_value_is_sum_of_children(root in tree_strategy()) {
		let nodes = layout(&root);
		for (i, node) in nodes.iter().enumerate().filter(|(_, n)| n.has_children) {
			let sum: f64 = nodes.iter().filter(|c| c.parent == Some(i)).map(|c| c.value).sum();
			prop_assert!((node.value - sum).abs() < 1e-9);
		}
	}
}
