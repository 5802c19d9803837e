use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Map;

use super::json::{Adjacency, NetworkJson};
use super::types::{DocumentMetadata, Edge, Node, NetworkChange};
use crate::error::Rejected;

pub type SubscriptionId = usize;

type Listener = Rc<dyn Fn(&Network, &NetworkChange)>;

/// The canonical node/edge state of one document.
///
/// Mutations either apply completely and notify subscribers once, or return
/// a [`Rejected`] reason and leave the network untouched.
#[derive(Default)]
pub struct Network {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	metadata: DocumentMetadata,
	extra: Map<String, serde_json::Value>,
	listeners: Vec<(SubscriptionId, Listener)>,
	next_listener: SubscriptionId,
}

impl fmt::Debug for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Network")
			.field("nodes", &self.nodes)
			.field("edges", &self.edges)
			.field("metadata", &self.metadata)
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

impl Network {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_json(json: &NetworkJson) -> Self {
		let mut network = Self::new();
		network.load_from_json(json);
		network
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn metadata(&self) -> &DocumentMetadata {
		&self.metadata
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn get_node_by_id(&self, uuid: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.uuid == uuid)
	}

	pub fn get_edge_by_id(&self, edge_id: &str) -> Option<&Edge> {
		self.edges.iter().find(|e| e.edge_id == edge_id)
	}

	pub fn edge_between(&self, a: &str, b: &str) -> Option<&Edge> {
		self.edges.iter().find(|e| e.connects(a, b))
	}

	pub fn neighbours<'a>(&'a self, uuid: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.edges.iter().filter_map(move |e| e.other(uuid))
	}

	/// Register a change listener. Listeners run synchronously after each
	/// successful mutation and must not try to mutate the network.
	pub fn subscribe(&mut self, listener: impl Fn(&Network, &NetworkChange) + 'static) -> SubscriptionId {
		let id = self.next_listener;
		self.next_listener += 1;
		self.listeners.push((id, Rc::new(listener)));
		id
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) {
		self.listeners.retain(|(lid, _)| *lid != id);
	}

	fn notify(&self, change: NetworkChange) {
		for (_, listener) in &self.listeners {
			listener(self, &change);
		}
	}

	/// Add a node at `(x, y)`. With `props`, the node takes its identity and
	/// attributes from them (the position still comes from `x`/`y`); without,
	/// it gets a fresh uuid and a sequential name derived from `node_count`.
	pub fn add_node(
		&mut self,
		x: f64,
		y: f64,
		node_count: usize,
		props: Option<Node>,
	) -> Result<&Node, Rejected> {
		let node = match props {
			Some(mut node) => {
				if self.get_node_by_id(&node.uuid).is_some() {
					return Err(Rejected::DuplicateNode(node.uuid));
				}
				check_vulnerability(node.vulnerability)?;
				node.x_pos = x;
				node.y_pos = y;
				node
			}
			None => Node::new(
				uuid::Uuid::new_v4().to_string(),
				format!("node {}", node_count + 1),
				x,
				y,
			),
		};
		let uuid = node.uuid.clone();
		self.nodes.push(node);
		self.notify(NetworkChange::NodeAdded(uuid));
		Ok(&self.nodes[self.nodes.len() - 1])
	}

	/// Connect two existing, distinct, not yet connected nodes.
	pub fn add_edge(&mut self, edge: Edge) -> Result<&Edge, Rejected> {
		for end in [&edge.node_a, &edge.node_b] {
			if self.get_node_by_id(end).is_none() {
				return Err(Rejected::UnknownNode(end.clone()));
			}
		}
		if edge.node_a == edge.node_b {
			return Err(Rejected::SelfLoop(edge.node_a));
		}
		if self.edge_between(&edge.node_a, &edge.node_b).is_some() {
			return Err(Rejected::DuplicateEdge {
				a: edge.node_a,
				b: edge.node_b,
			});
		}
		if self.get_edge_by_id(&edge.edge_id).is_some() {
			return Err(Rejected::DuplicateEdgeId(edge.edge_id));
		}
		let id = edge.edge_id.clone();
		self.edges.push(edge);
		self.notify(NetworkChange::EdgeAdded(id));
		Ok(&self.edges[self.edges.len() - 1])
	}

	/// Remove a node together with every edge touching it.
	pub fn remove_node(&mut self, uuid: &str) -> Option<Node> {
		let index = self.nodes.iter().position(|n| n.uuid == uuid)?;
		let node = self.nodes.remove(index);
		let mut removed = Vec::new();
		self.edges.retain(|e| {
			if e.touches(uuid) {
				removed.push(e.edge_id.clone());
				false
			} else {
				true
			}
		});
		self.notify(NetworkChange::NodeRemoved {
			uuid: node.uuid.clone(),
			edges: removed,
		});
		Some(node)
	}

	pub fn remove_edge(&mut self, edge_id: &str) -> Option<Edge> {
		let index = self.edges.iter().position(|e| e.edge_id == edge_id)?;
		let edge = self.edges.remove(index);
		self.notify(NetworkChange::EdgeRemoved(edge.edge_id.clone()));
		Some(edge)
	}

	/// Replace the node with the same uuid, keeping its place in the list.
	pub fn edit_node_details(&mut self, props: Node) -> Result<&Node, Rejected> {
		let index = self
			.nodes
			.iter()
			.position(|n| n.uuid == props.uuid)
			.ok_or_else(|| Rejected::UnknownNode(props.uuid.clone()))?;
		check_vulnerability(props.vulnerability)?;
		let uuid = props.uuid.clone();
		self.nodes[index] = props;
		self.notify(NetworkChange::NodeUpdated(uuid));
		Ok(&self.nodes[index])
	}

	pub fn set_node_position(&mut self, uuid: &str, x: f64, y: f64) -> Result<&Node, Rejected> {
		let index = self
			.nodes
			.iter()
			.position(|n| n.uuid == uuid)
			.ok_or_else(|| Rejected::UnknownNode(uuid.to_owned()))?;
		self.nodes[index].x_pos = x;
		self.nodes[index].y_pos = y;
		self.notify(NetworkChange::NodeUpdated(uuid.to_owned()));
		Ok(&self.nodes[index])
	}

	/// Apply `transform` to every node as one change.
	pub fn update_all_nodes(&mut self, mut transform: impl FnMut(&mut Node)) {
		for node in &mut self.nodes {
			transform(node);
			node.vulnerability = node.vulnerability.clamp(0.0, 1.0);
		}
		self.notify(NetworkChange::NodesUpdated);
	}

	pub fn set_metadata(&mut self, metadata: DocumentMetadata) {
		self.metadata = metadata;
		self.notify(NetworkChange::MetadataChanged);
	}

	pub fn to_json(&self) -> NetworkJson {
		let nodes: IndexMap<String, Node> = self
			.nodes
			.iter()
			.map(|n| (n.uuid.clone(), n.clone()))
			.collect();

		let mut edges: Adjacency = self
			.nodes
			.iter()
			.map(|n| (n.uuid.clone(), IndexMap::new()))
			.collect();
		for edge in &self.edges {
			for (from, to) in [(&edge.node_a, &edge.node_b), (&edge.node_b, &edge.node_a)] {
				edges
					.entry(from.clone())
					.or_default()
					.insert(to.clone(), Map::new());
			}
		}

		NetworkJson {
			nodes: Some(nodes),
			edges: Some(edges),
			doc_metadata: Some(self.metadata.clone()),
			extra: self.extra.clone(),
		}
	}

	/// Replace the contents with `json`. Does nothing, and returns false,
	/// unless both `nodes` and `_doc_metadata` are present.
	///
	/// Subscribers are kept and receive a single [`NetworkChange::Reloaded`].
	pub fn load_from_json(&mut self, json: &NetworkJson) -> bool {
		let (Some(nodes), Some(metadata)) = (&json.nodes, &json.doc_metadata) else {
			debug!("network json without nodes or _doc_metadata, ignoring");
			return false;
		};

		let listeners = std::mem::take(&mut self.listeners);
		self.nodes.clear();
		self.edges.clear();

		for (count, node) in nodes.values().enumerate() {
			let mut node = node.clone();
			if !(0.0..=1.0).contains(&node.vulnerability) {
				warn!(
					"clamping vulnerability {} of node {} while loading",
					node.vulnerability, node.uuid
				);
				node.vulnerability = node.vulnerability.clamp(0.0, 1.0);
			}
			if let Err(reason) = self.add_node(node.x_pos, node.y_pos, count, Some(node)) {
				warn!("skipping node while loading: {reason}");
			}
		}
		for (from, neighbours) in json.edges.iter().flatten() {
			for to in neighbours.keys() {
				// the reverse entry of an edge already loaded is rejected here
				let edge = Edge::new(uuid::Uuid::new_v4().to_string(), from, to);
				if let Err(reason @ Rejected::UnknownNode(_)) = self.add_edge(edge) {
					warn!("skipping edge {from} - {to} while loading: {reason}");
				}
			}
		}
		self.metadata = metadata.clone();
		self.extra = json.extra.clone();

		self.listeners = listeners;
		self.notify(NetworkChange::Reloaded);
		true
	}
}

fn check_vulnerability(value: f64) -> Result<(), Rejected> {
	if (0.0..=1.0).contains(&value) {
		Ok(())
	} else {
		Err(Rejected::VulnerabilityOutOfRange(value))
	}
}
