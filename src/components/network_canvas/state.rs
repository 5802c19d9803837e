use indexmap::IndexMap;

use super::types::{CanvasEvent, Selection, Target};
use crate::network::{Edge, Network, NetworkChange, Node};

const ENTRY_COLOR: &str = "#2ca02c";
const HIGH_VALUE_COLOR: &str = "#d62728";
const ENTRY_AND_HIGH_VALUE_COLOR: &str = "#9467bd";
/// Standard nodes blend from this colour to `RISK_RGB` with vulnerability.
const SAFE_RGB: (f64, f64, f64) = (31.0, 119.0, 180.0);
const RISK_RGB: (f64, f64, f64) = (255.0, 127.0, 14.0);

pub const NODE_RADIUS: f64 = 10.0;
pub const HIT_RADIUS: f64 = 14.0;
pub const EDGE_HIT_DISTANCE: f64 = 5.0;
/// Screen pixels a press may travel and still count as a click.
pub const DRAG_THRESHOLD: f64 = 3.0;
const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct VisualNode {
	pub label: String,
	pub x: f64,
	pub y: f64,
	pub color: String,
}

impl From<&Node> for VisualNode {
	fn from(node: &Node) -> Self {
		Self {
			label: node.name.clone(),
			x: node.x_pos,
			y: node.y_pos,
			color: node_color(node),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualEdge {
	pub source: String,
	pub target: String,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<String>,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// The canvas-side mirror of a network: what is drawn, where the camera is,
/// and which gesture is under way.
///
/// It only ever reads the model. Updates addressed to elements it does not
/// hold are ignored, since an earlier event may already have removed them.
pub struct NetworkCanvasState {
	pub nodes: IndexMap<String, VisualNode>,
	pub edges: IndexMap<String, VisualEdge>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub selection: Option<Selection>,
	pub highlighted: Option<String>,
	pub highlighted_neighbours: Vec<String>,
	pub width: f64,
	pub height: f64,
	pub fit_padding: f64,
}

impl NetworkCanvasState {
	pub fn new(width: f64, height: f64, fit_padding: f64) -> Self {
		Self {
			nodes: IndexMap::new(),
			edges: IndexMap::new(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			selection: None,
			highlighted: None,
			highlighted_neighbours: Vec::new(),
			width,
			height,
			fit_padding,
		}
	}

	/// Drop everything and draw `network` from scratch, fitted to the view.
	pub fn load_network(&mut self, network: &Network) {
		self.nodes.clear();
		self.edges.clear();
		self.selection = None;
		self.clear_highlight();
		for node in network.nodes() {
			self.add_node(node);
		}
		for edge in network.edges() {
			self.add_edge(edge);
		}
		self.reset_view();
	}

	pub fn add_node(&mut self, node: &Node) {
		self.nodes.insert(node.uuid.clone(), VisualNode::from(node));
	}

	pub fn update_node(&mut self, node: &Node) {
		if let Some(visual) = self.nodes.get_mut(&node.uuid) {
			*visual = VisualNode::from(node);
		}
	}

	pub fn remove_node(&mut self, uuid: &str) {
		if self.nodes.shift_remove(uuid).is_none() {
			return;
		}
		self.edges
			.retain(|_, e| e.source != uuid && e.target != uuid);
		if self.highlighted.as_deref() == Some(uuid) {
			self.clear_highlight();
		}
		self.highlighted_neighbours.retain(|n| n != uuid);
		self.forget_selection(uuid);
	}

	pub fn add_edge(&mut self, edge: &Edge) {
		if !self.nodes.contains_key(&edge.node_a) || !self.nodes.contains_key(&edge.node_b) {
			return;
		}
		self.edges.insert(
			edge.edge_id.clone(),
			VisualEdge {
				source: edge.node_a.clone(),
				target: edge.node_b.clone(),
			},
		);
	}

	pub fn remove_edge(&mut self, edge_id: &str) {
		if self.edges.shift_remove(edge_id).is_some() {
			self.forget_selection(edge_id);
		}
	}

	fn forget_selection(&mut self, id: &str) {
		if self.selection.as_ref().is_some_and(|s| s.id() == id) {
			self.selection = None;
		}
	}

	/// Mirror one model change.
	pub fn apply_change(&mut self, network: &Network, change: &NetworkChange) {
		match change {
			NetworkChange::NodeAdded(uuid) => {
				if let Some(node) = network.get_node_by_id(uuid) {
					self.add_node(node);
				}
			}
			NetworkChange::NodeUpdated(uuid) => {
				if let Some(node) = network.get_node_by_id(uuid) {
					self.update_node(node);
				}
			}
			NetworkChange::NodeRemoved { uuid, edges } => {
				for edge in edges {
					self.remove_edge(edge);
				}
				self.remove_node(uuid);
			}
			NetworkChange::EdgeAdded(id) => {
				if let Some(edge) = network.get_edge_by_id(id) {
					self.add_edge(edge);
				}
			}
			NetworkChange::EdgeRemoved(id) => self.remove_edge(id),
			NetworkChange::NodesUpdated => {
				for node in network.nodes() {
					self.update_node(node);
				}
			}
			NetworkChange::MetadataChanged => {}
			NetworkChange::Reloaded => self.load_network(network),
		}
	}

	/// Fit every node into the view with `fit_padding` to spare.
	pub fn reset_view(&mut self) {
		let mut bounds: Option<(f64, f64, f64, f64)> = None;
		for node in self.nodes.values() {
			let (x0, y0, x1, y1) = bounds.unwrap_or((node.x, node.y, node.x, node.y));
			bounds = Some((x0.min(node.x), y0.min(node.y), x1.max(node.x), y1.max(node.y)));
		}
		let Some((x0, y0, x1, y1)) = bounds else {
			self.transform = ViewTransform {
				x: self.width / 2.0,
				y: self.height / 2.0,
				k: 1.0,
			};
			return;
		};

		// node discs must fit too, not just their centres
		let (bw, bh) = (x1 - x0 + 2.0 * NODE_RADIUS, y1 - y0 + 2.0 * NODE_RADIUS);
		let (aw, ah) = (
			(self.width - 2.0 * self.fit_padding).max(1.0),
			(self.height - 2.0 * self.fit_padding).max(1.0),
		);
		let k = (aw / bw).min(ah / bh).clamp(MIN_ZOOM, MAX_ZOOM);
		let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
	}

	/// Pan so `uuid` sits in the middle of the view and mark it, along with
	/// the nodes it links to, highlighted.
	pub fn center_and_highlight<'a>(&mut self, uuid: &str, neighbours: impl IntoIterator<Item = &'a str>) {
		let Some(node) = self.nodes.get(uuid) else {
			return;
		};
		self.transform.x = self.width / 2.0 - node.x * self.transform.k;
		self.transform.y = self.height / 2.0 - node.y * self.transform.k;
		self.highlighted = Some(uuid.to_owned());
		self.highlighted_neighbours = neighbours
			.into_iter()
			.filter(|n| self.nodes.contains_key(*n))
			.map(str::to_owned)
			.collect();
	}

	pub fn clear_highlight(&mut self) {
		self.highlighted = None;
		self.highlighted_neighbours.clear();
	}

	pub fn is_highlighted(&self, uuid: &str) -> bool {
		self.highlighted.as_deref() == Some(uuid) || self.highlighted_neighbours.iter().any(|n| n == uuid)
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&str> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		// last drawn is on top
		self.nodes
			.iter()
			.rev()
			.find(|(_, node)| {
				let (dx, dy) = (node.x - gx, node.y - gy);
				// HIT_RADIUS is in world-space, scales with zoom like nodes
				(dx * dx + dy * dy).sqrt() < HIT_RADIUS
			})
			.map(|(id, _)| id.as_str())
	}

	pub fn edge_at_position(&self, sx: f64, sy: f64) -> Option<&str> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.edges
			.iter()
			.rev()
			.find(|(_, edge)| {
				let (Some(a), Some(b)) = (self.nodes.get(&edge.source), self.nodes.get(&edge.target))
				else {
					return false;
				};
				distance_to_segment((gx, gy), (a.x, a.y), (b.x, b.y)) < EDGE_HIT_DISTANCE
			})
			.map(|(id, _)| id.as_str())
	}

	pub fn target_at(&self, sx: f64, sy: f64) -> Target {
		if let Some(id) = self.node_at_position(sx, sy) {
			Target::Node(id.to_owned())
		} else if let Some(id) = self.edge_at_position(sx, sy) {
			Target::Edge(id.to_owned())
		} else {
			Target::Background
		}
	}

	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let hit = self
			.node_at_position(sx, sy)
			.and_then(|id| self.nodes.get(id).map(|n| (id.to_owned(), n.x, n.y)));
		if let Some((id, x, y)) = hit {
			self.drag = DragState {
				active: true,
				node: Some(id),
				moved: false,
				start_x: sx,
				start_y: sy,
				node_start_x: x,
				node_start_y: y,
			};
		} else {
			self.pan = PanState {
				active: true,
				moved: false,
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> Option<CanvasEvent> {
		if self.drag.active {
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if !self.drag.moved && dx.hypot(dy) < DRAG_THRESHOLD {
				return None;
			}
			self.drag.moved = true;
			let id = self.drag.node.clone()?;
			return Some(CanvasEvent::NodeDragged {
				id,
				x: self.drag.node_start_x + dx / self.transform.k,
				y: self.drag.node_start_y + dy / self.transform.k,
			});
		}
		if self.pan.active {
			let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
			if self.pan.moved || dx.hypot(dy) >= DRAG_THRESHOLD {
				self.pan.moved = true;
				self.transform.x = self.pan.transform_start_x + dx;
				self.transform.y = self.pan.transform_start_y + dy;
			}
		}
		None
	}

	/// Finish a press; one that never travelled is a tap.
	pub fn pointer_up(&mut self, sx: f64, sy: f64) -> Option<CanvasEvent> {
		let tapped = if self.drag.active && !self.drag.moved {
			self.drag.node.clone().map(Target::Node)
		} else if self.pan.active && !self.pan.moved {
			Some(self.target_at(sx, sy))
		} else {
			None
		};
		self.pointer_leave();
		tapped.map(CanvasEvent::Tapped)
	}

	pub fn pointer_leave(&mut self) {
		self.drag = DragState::default();
		self.pan = PanState::default();
	}

	/// Only double clicks on empty canvas create nodes.
	pub fn double_click(&self, sx: f64, sy: f64) -> Option<CanvasEvent> {
		if self.target_at(sx, sy) != Target::Background {
			return None;
		}
		let (x, y) = self.screen_to_graph(sx, sy);
		Some(CanvasEvent::CanvasDoubleClicked { x, y })
	}

	pub fn zoom(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

pub fn node_color(node: &Node) -> String {
	match (node.entry_node, node.high_value_node) {
		(true, true) => ENTRY_AND_HIGH_VALUE_COLOR.into(),
		(true, false) => ENTRY_COLOR.into(),
		(false, true) => HIGH_VALUE_COLOR.into(),
		(false, false) => {
			let t = node.vulnerability.clamp(0.0, 1.0);
			let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
			format!(
				"rgb({}, {}, {})",
				mix(SAFE_RGB.0, RISK_RGB.0),
				mix(SAFE_RGB.1, RISK_RGB.1),
				mix(SAFE_RGB.2, RISK_RGB.2)
			)
		}
	}
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
	let (abx, aby) = (b.0 - a.0, b.1 - a.1);
	let len2 = abx * abx + aby * aby;
	let t = if len2 == 0.0 {
		0.0
	} else {
		(((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len2).clamp(0.0, 1.0)
	};
	let (cx, cy) = (a.0 + t * abx, a.1 + t * aby);
	(p.0 - cx).hypot(p.1 - cy)
}
