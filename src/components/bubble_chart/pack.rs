//! Hierarchical circle packing.
//!
//! Leaves get a radius proportional to the square root of their value, siblings
//! are packed around each other with a front chain, every parent becomes the
//! smallest circle enclosing its packed children, and the whole tree is scaled
//! to fit the layout square.

/// Input tree: a node carries user data, its own value if it is a leaf, and
/// children. Interior values are the sum of their leaves.
#[derive(Clone, Debug)]
pub struct PackNode<T> {
	pub data: T,
	pub value: f64,
	pub children: Vec<PackNode<T>>,
}

impl<T> PackNode<T> {
	pub fn leaf(data: T, value: f64) -> Self {
		Self {
			data,
			value,
			children: Vec::new(),
		}
	}

	pub fn branch(data: T, children: Vec<PackNode<T>>) -> Self {
		Self {
			data,
			value: 0.0,
			children,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Circle {
	pub x: f64,
	pub y: f64,
	pub r: f64,
}

impl Circle {
	pub fn new(x: f64, y: f64, r: f64) -> Self {
		Self { x, y, r }
	}
}

/// Layout output for one node, in pre-order.
#[derive(Clone, Debug)]
pub struct PositionedNode<'a, T> {
	pub data: &'a T,
	pub depth: usize,
	pub parent: Option<usize>,
	pub has_children: bool,
	pub value: f64,
	pub circle: Circle,
}

#[derive(Clone, Copy, Debug)]
pub struct PackLayout {
	pub width: f64,
	pub height: f64,
	pub padding: f64,
}

impl PackLayout {
	pub fn new(width: f64, height: f64, padding: f64) -> Self {
		Self {
			width,
			height,
			padding,
		}
	}

	/// Lay out every node of `root`, returned in pre-order (root first, then each
	/// subtree in child order).
	pub fn nodes<'a, T>(&self, root: &'a PackNode<T>) -> Vec<PositionedNode<'a, T>> {
		let mut out = Vec::new();
		let mut children_of: Vec<Vec<usize>> = Vec::new();
		flatten(root, 0, None, &mut out, &mut children_of);

		// Children always follow their parent in pre-order, so a reverse walk
		// visits every subtree before its root.
		for i in (0..out.len()).rev() {
			if children_of[i].is_empty() {
				let v = out[i].value;
				out[i].value = if v.is_finite() { v.max(0.0) } else { 0.0 };
				out[i].circle.r = out[i].value.sqrt();
			} else {
				out[i].value = children_of[i].iter().map(|&c| out[c].value).sum();
			}
		}

		let side = self.width.min(self.height);
		pack_all(&mut out, &children_of, 0.0);
		let root_r = out[0].circle.r;
		if root_r <= 0.0 || !root_r.is_finite() {
			for node in &mut out {
				node.circle = Circle::new(self.width / 2.0, self.height / 2.0, 0.0);
			}
			return out;
		}
		let pad = self.padding * root_r / side;
		pack_all(&mut out, &children_of, pad);

		let k = side / (2.0 * out[0].circle.r);
		out[0].circle = Circle::new(self.width / 2.0, self.height / 2.0, side / 2.0);
		for i in 1..out.len() {
			let Some(p) = out[i].parent else { continue };
			let parent = out[p].circle;
			let c = &mut out[i].circle;
			c.r *= k;
			c.x = parent.x + k * c.x;
			c.y = parent.y + k * c.y;
		}
		out
	}
}

fn flatten<'a, T>(
	node: &'a PackNode<T>,
	depth: usize,
	parent: Option<usize>,
	out: &mut Vec<PositionedNode<'a, T>>,
	children_of: &mut Vec<Vec<usize>>,
) {
	let idx = out.len();
	out.push(PositionedNode {
		data: &node.data,
		depth,
		parent,
		has_children: !node.children.is_empty(),
		value: node.value,
		circle: Circle::default(),
	});
	children_of.push(Vec::new());
	if let Some(p) = parent {
		children_of[p].push(idx);
	}
	for child in &node.children {
		flatten(child, depth + 1, Some(idx), out, children_of);
	}
}

/// Pack every interior node bottom-up, growing each child by `r` while its
/// siblings are placed. Child positions are relative to the
/// parent's centre until the final translation.
fn pack_all<T>(out: &mut [PositionedNode<'_, T>], children_of: &[Vec<usize>], r: f64) {
	for i in (0..out.len()).rev() {
		let kids = &children_of[i];
		if kids.is_empty() {
			continue;
		}
		let mut circles: Vec<Circle> = kids
			.iter()
			.map(|&c| {
				let mut circle = out[c].circle;
				circle.r += r;
				circle
			})
			.collect();
		let enclosing = pack_siblings(&mut circles);
		for (&c, circle) in kids.iter().zip(&circles) {
			out[c].circle = Circle::new(circle.x, circle.y, circle.r - r);
		}
		out[i].circle.r = enclosing + r;
	}
}

fn place(b: Circle, a: Circle, c: &mut Circle) {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let d2 = dx * dx + dy * dy;
	if d2 > 0.0 {
		let a2 = (a.r + c.r).powi(2);
		let b2 = (b.r + c.r).powi(2);
		if a2 > b2 {
			let x = (d2 + b2 - a2) / (2.0 * d2);
			let y = (b2 / d2 - x * x).max(0.0).sqrt();
			c.x = b.x - x * dx - y * dy;
			c.y = b.y - x * dy + y * dx;
		} else {
			let x = (d2 + a2 - b2) / (2.0 * d2);
			let y = (a2 / d2 - x * x).max(0.0).sqrt();
			c.x = a.x + x * dx - y * dy;
			c.y = a.y + x * dy + y * dx;
		}
	} else {
		c.x = a.x + c.r;
		c.y = a.y;
	}
}

fn intersects(a: Circle, b: Circle) -> bool {
	let dr = a.r + b.r - 1e-6;
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted centroid of `a` and `b`.
fn score(a: Circle, b: Circle) -> f64 {
	let ab = a.r + b.r;
	if ab == 0.0 {
		return a.x * a.x + a.y * a.y;
	}
	let dx = (a.x * b.r + b.x * a.r) / ab;
	let dy = (a.y * b.r + b.y * a.r) / ab;
	dx * dx + dy * dy
}

/// Pack `circles` tangentially around the origin (in input order), then centre
/// them on their enclosing circle. Returns the enclosing radius.
pub fn pack_siblings(circles: &mut [Circle]) -> f64 {
	let n = circles.len();
	if n == 0 {
		return 0.0;
	}
	circles[0].x = 0.0;
	circles[0].y = 0.0;
	if n == 1 {
		return circles[0].r;
	}
	circles[0].x = -circles[1].r;
	circles[1].x = circles[0].r;
	circles[1].y = 0.0;
	if n == 2 {
		return circles[0].r + circles[1].r;
	}
	let (c0, c1) = (circles[0], circles[1]);
	place(c1, c0, &mut circles[2]);

	// Front chain as a circular doubly linked list over circle indices.
	let mut next = vec![usize::MAX; n];
	let mut prev = vec![usize::MAX; n];
	let (mut a, mut b) = (0usize, 1usize);
	next[0] = 1;
	prev[1] = 0;
	next[1] = 2;
	prev[2] = 1;
	next[2] = 0;
	prev[0] = 2;

	let mut i = 3;
	'pack: while i < n {
		let (ca, cb) = (circles[a], circles[b]);
		place(ca, cb, &mut circles[i]);
		let c = circles[i];

		// Look for the nearest intersecting circle along the chain, walking
		// forward from b and backward from a by accumulated radius.
		let (mut j, mut k) = (next[b], prev[a]);
		let (mut sj, mut sk) = (circles[b].r, circles[a].r);
		loop {
			if sj <= sk {
				if intersects(circles[j], c) {
					b = j;
					next[a] = b;
					prev[b] = a;
					continue 'pack;
				}
				sj += circles[j].r;
				j = next[j];
			} else {
				if intersects(circles[k], c) {
					a = k;
					next[a] = b;
					prev[b] = a;
					continue 'pack;
				}
				sk += circles[k].r;
				k = prev[k];
			}
			if j == next[k] {
				break;
			}
		}

		// The chain only approximates the outline of the packed set. A placement
		// that still hits an earlier circle is moved clear of all of them and
		// left off the chain.
		if circles[..i].iter().any(|&p| intersects(p, c)) {
			let (x, y) = clear_position(&circles[..i], &next, b, c.r);
			circles[i].x = x;
			circles[i].y = y;
			i += 1;
			continue;
		}

		prev[i] = a;
		next[i] = b;
		next[a] = i;
		prev[b] = i;
		b = i;

		// Move a to the chain pair closest to the centroid.
		let mut best = score(circles[a], circles[next[a]]);
		let mut node = next[b];
		while node != b {
			let s = score(circles[node], circles[next[node]]);
			if s < best {
				a = node;
				best = s;
			}
			node = next[node];
		}
		b = next[a];
		i += 1;
	}

	let e = enclose(circles);
	for circle in circles.iter_mut() {
		circle.x -= e.x;
		circle.y -= e.y;
	}
	e.r
}

/// Centre for a circle of radius `r` that overlaps none of `placed`. It sits
/// tangent to a pair of neighbouring chain circles where possible, otherwise just
/// outside the enclosing circle; the candidate nearest the origin wins.
fn clear_position(placed: &[Circle], next: &[usize], start: usize, r: f64) -> (f64, f64) {
	let e = enclose(placed);
	let mut best = Circle::new(e.x + e.r * (1.0 + 1e-6) + r, e.y, r);
	let mut best_d = best.x * best.x + best.y * best.y;
	let mut node = start;
	loop {
		let (p, q) = (placed[node], placed[next[node]]);
		for (u, v) in [(p, q), (q, p)] {
			let mut c = Circle::new(0.0, 0.0, r);
			place(u, v, &mut c);
			let d = c.x * c.x + c.y * c.y;
			if d < best_d && !placed.iter().any(|&o| intersects(o, c)) {
				best = c;
				best_d = d;
			}
		}
		node = next[node];
		if node == start {
			break;
		}
	}
	(best.x, best.y)
}

/// Deterministic linear congruential generator used to shuffle enclose input.
struct Lcg(u32);

impl Lcg {
	fn next(&mut self) -> f64 {
		self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
		self.0 as f64 / 4_294_967_296.0
	}
}

/// Smallest circle enclosing every circle in `circles`.
pub fn enclose(circles: &[Circle]) -> Circle {
	let mut pool = circles.to_vec();
	let mut rng = Lcg(1);
	for m in (1..pool.len()).rev() {
		let j = (rng.next() * (m + 1) as f64) as usize;
		pool.swap(m, j.min(m));
	}

	// Degenerate input (NaN, or rounding that keeps rejecting the basis) would
	// otherwise restart forever.
	let max_restarts = 64 * (pool.len() + 1);
	let mut restarts = 0;
	let mut basis: Vec<Circle> = Vec::new();
	let mut e: Option<Circle> = None;
	let mut i = 0;
	while i < pool.len() {
		let p = pool[i];
		match e {
			Some(current) if encloses_weak(current, p) => i += 1,
			_ if restarts == max_restarts => break,
			_ => {
				basis = extend_basis(&basis, p);
				e = Some(enclose_basis(&basis));
				restarts += 1;
				i = 0;
			}
		}
	}
	match e {
		Some(e) if i < pool.len() => cover(e, &pool),
		Some(e) => e,
		None => Circle::default(),
	}
}

/// `e` grown about its centre until it contains every circle.
fn cover(e: Circle, circles: &[Circle]) -> Circle {
	let r = circles
		.iter()
		.map(|c| (c.x - e.x).hypot(c.y - e.y) + c.r)
		.fold(e.r, f64::max);
	Circle::new(e.x, e.y, r)
}

fn extend_basis(basis: &[Circle], p: Circle) -> Vec<Circle> {
	if encloses_weak_all(p, basis) {
		return vec![p];
	}
	for &b in basis {
		if encloses_not(p, b) && encloses_weak_all(enclose_basis2(b, p), basis) {
			return vec![b, p];
		}
	}
	for i in 0..basis.len().saturating_sub(1) {
		for j in i + 1..basis.len() {
			let (bi, bj) = (basis[i], basis[j]);
			if encloses_not(enclose_basis2(bi, bj), p)
				&& encloses_not(enclose_basis2(bi, p), bj)
				&& encloses_not(enclose_basis2(bj, p), bi)
				&& encloses_weak_all(enclose_basis3(bi, bj, p), basis)
			{
				return vec![bi, bj, p];
			}
		}
	}
	// Only reachable through floating point degeneracy; restart from p so the
	// outer loop still makes progress.
	vec![p]
}

fn encloses_not(a: Circle, b: Circle) -> bool {
	let dr = a.r - b.r;
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: Circle, b: Circle) -> bool {
	let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: Circle, basis: &[Circle]) -> bool {
	basis.iter().all(|&b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
	match basis {
		[a] => *a,
		[a, b] => enclose_basis2(*a, *b),
		[a, b, c] => enclose_basis3(*a, *b, *c),
		_ => Circle::default(),
	}
}

fn enclose_basis2(a: Circle, b: Circle) -> Circle {
	let (x21, y21, r21) = (b.x - a.x, b.y - a.y, b.r - a.r);
	let l = (x21 * x21 + y21 * y21).sqrt();
	if l == 0.0 {
		return if a.r >= b.r { a } else { b };
	}
	Circle::new(
		(a.x + b.x + x21 / l * r21) / 2.0,
		(a.y + b.y + y21 / l * r21) / 2.0,
		(l + a.r + b.r) / 2.0,
	)
}

fn enclose_basis3(a: Circle, b: Circle, c: Circle) -> Circle {
	let (x1, y1, r1) = (a.x, a.y, a.r);
	let (x2, y2, r2) = (b.x, b.y, b.r);
	let (x3, y3, r3) = (c.x, c.y, c.r);
	let a2 = x1 - x2;
	let a3 = x1 - x3;
	let b2 = y1 - y2;
	let b3 = y1 - y3;
	let c2 = r2 - r1;
	let c3 = r3 - r1;
	let d1 = x1 * x1 + y1 * y1 - r1 * r1;
	let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
	let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
	let ab = a3 * b2 - a2 * b3;
	let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
	let xb = (b3 * c2 - b2 * c3) / ab;
	let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
	let yb = (a2 * c3 - a3 * c2) / ab;
	let qa = xb * xb + yb * yb - 1.0;
	let qb = 2.0 * (r1 + xa * xb + ya * yb);
	let qc = xa * xa + ya * ya - r1 * r1;
	let r = -(if qa.abs() > 1e-6 {
		(qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
	} else {
		qc / qb
	});
	Circle::new(x1 + xa + xb * r, y1 + ya + yb * r, r)
}

#[cfg(test)]
mod tests {
	use super::*;

	const EPS: f64 = 1e-6;

	fn overlap(a: Circle, b: Circle) -> bool {
		let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
		d + EPS < a.r + b.r
	}

	fn contains(outer: Circle, inner: Circle) -> bool {
		let d = ((outer.x - inner.x).powi(2) + (outer.y - inner.y).powi(2)).sqrt();
		d + inner.r <= outer.r + 1e-6 * outer.r.max(1.0)
	}

	#[test]
	fn two_siblings_touch() {
		let mut circles = [Circle::new(0.0, 0.0, 1.0), Circle::new(0.0, 0.0, 2.0)];
		let r = pack_siblings(&mut circles);
		assert_eq!(r, 3.0);
		let d = (circles[1].x - circles[0].x).abs();
		assert!((d - 3.0).abs() < EPS);
	}

	#[test]
	fn many_siblings_do_not_overlap_and_are_enclosed() {
		let mut circles: Vec<Circle> = (1..=40)
			.map(|i| Circle::new(0.0, 0.0, 1.0 + (i % 7) as f64))
			.collect();
		let r = pack_siblings(&mut circles);
		let outer = Circle::new(0.0, 0.0, r);
		for (i, a) in circles.iter().enumerate() {
			assert!(contains(outer, *a), "circle {i} escapes");
			for b in &circles[i + 1..] {
				assert!(!overlap(*a, *b));
			}
		}
	}

	#[test]
	fn enclose_of_three_equal_circles() {
		let h = 3f64.sqrt();
		let e = enclose(&[
			Circle::new(-1.0, 0.0, 1.0),
			Circle::new(1.0, 0.0, 1.0),
			Circle::new(0.0, h, 1.0),
		]);
		assert!((e.x).abs() < EPS);
		assert!((e.y - h / 3.0).abs() < EPS);
		assert!((e.r - (1.0 + 2.0 / h)).abs() < EPS);
	}

	#[test]
	fn enclose_gives_up_on_nan_input() {
		let circles = [
			Circle::new(0.0, 0.0, 1.0),
			Circle::new(f64::NAN, 0.0, 1.0),
			Circle::new(3.0, 0.0, 1.0),
		];
		// Returns at all; the result is meaningless.
		let _ = enclose(&circles);
	}

	#[test]
	fn cover_grows_to_contain_every_circle() {
		let circles = [Circle::new(0.0, 0.0, 1.0), Circle::new(10.0, 0.0, 2.0)];
		let e = cover(Circle::new(0.0, 0.0, 1.0), &circles);
		assert_eq!(e, Circle::new(0.0, 0.0, 12.0));
	}

	#[test]
	fn zero_weight_leaves_keep_clear_of_heavy_siblings() {
		let weights: [&[f64]; 2] = [
			&[
				0.0,
				0.0,
				0.0,
				0.0,
				3.0,
				1.0,
				0.0,
				3.0,
				0.0,
				0.0,
				1_225_798_862.0,
				0.0,
				1_367_219_825.0,
			],
			&[2.0, 225_253_961.0],
		];
		let root = PackNode::branch(
			(),
			weights
				.iter()
				.map(|ws| PackNode::branch((), ws.iter().map(|&w| PackNode::leaf((), w)).collect()))
				.collect(),
		);
		let nodes = PackLayout::new(800.0, 800.0, 1.5).nodes(&root);
		for (i, a) in nodes.iter().enumerate() {
			for b in nodes[i + 1..].iter().filter(|b| b.parent == a.parent) {
				let (p, q) = (a.circle, b.circle);
				let gap = (p.x - q.x).hypot(p.y - q.y) - p.r - q.r;
				assert!(gap > 1.0, "siblings {p:?} and {q:?} are {gap} apart");
			}
		}
	}

	#[test]
	fn single_leaf_fills_the_square() {
		let root = PackNode::branch((), vec![PackNode::branch((), vec![PackNode::leaf((), 10.0)])]);
		let nodes = PackLayout::new(800.0, 800.0, 1.5).nodes(&root);
		assert_eq!(nodes.len(), 3);
		assert_eq!(nodes[0].circle, Circle::new(400.0, 400.0, 400.0));
		// Two levels of padding sit between the leaf and the canvas edge.
		let expected = 400.0 / (1.0 + 4.0 * 1.5 / 800.0);
		assert!((nodes[2].circle.r - expected).abs() < 1e-9);
		assert!((nodes[2].circle.x - 400.0).abs() < 1e-9);
		assert_eq!(nodes[1].value, 10.0);
		assert_eq!(nodes[2].depth, 2);
		assert_eq!(nodes[2].parent, Some(1));
	}

	#[test]
	fn nodes_come_back_in_preorder() {
		let root = PackNode::branch(
			"root",
			vec![
				PackNode::branch("g1", vec![PackNode::leaf("a", 1.0), PackNode::leaf("b", 2.0)]),
				PackNode::branch("g2", vec![PackNode::leaf("c", 3.0)]),
			],
		);
		let nodes = PackLayout::new(800.0, 800.0, 1.5).nodes(&root);
		let order: Vec<_> = nodes.iter().map(|n| *n.data).collect();
		assert_eq!(order, ["root", "g1", "a", "b", "g2", "c"]);
		assert_eq!(nodes[0].value, 6.0);
	}

	#[test]
	fn children_stay_inside_parents() {
		let groups = (0..6)
			.map(|g| {
				PackNode::branch(
					g,
					(0..(g + 2)).map(|l| PackNode::leaf(l, (1 + l * 3) as f64)).collect(),
				)
			})
			.collect();
		let root = PackNode::branch(100, groups);
		let nodes = PackLayout::new(800.0, 800.0, 1.5).nodes(&root);
		for node in &nodes[1..] {
			let parent = nodes[node.parent.unwrap()].circle;
			assert!(contains(parent, node.circle));
		}
	}

	#[test]
	fn zero_weight_collapses_to_centre() {
		let root = PackNode::branch((), vec![PackNode::branch((), vec![PackNode::leaf((), 0.0)])]);
		let nodes = PackLayout::new(800.0, 800.0, 1.5).nodes(&root);
		assert!(nodes.iter().all(|n| n.circle == Circle::new(400.0, 400.0, 0.0)));
	}

	#[test]
	fn negative_values_count_as_zero() {
		let root = PackNode::branch(
			(),
			vec![PackNode::branch((), vec![PackNode::leaf((), -5.0), PackNode::leaf((), 4.0)])],
		);
		let nodes = PackLayout::new(800.0, 800.0, 1.5).nodes(&root);
		assert_eq!(nodes[2].circle.r, 0.0);
		assert_eq!(nodes[1].value, 4.0);
	}
}
