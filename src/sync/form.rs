//! One-way binding between the selected node and the properties panel.
//!
//! The panel shows a copy of a node's values; edits come back as a whole
//! [`NodeFormValues`] and are rounded before they reach the model.

use crate::network::{Network, NetworkChange, Node};

pub const POSITION_PLACES: i32 = 2;
pub const VULNERABILITY_PLACES: i32 = 6;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeFormValues {
	pub uuid: String,
	pub name: String,
	pub x_pos: f64,
	pub y_pos: f64,
	pub entry_node: bool,
	pub high_value_node: bool,
	pub vulnerability: f64,
}

impl From<&Node> for NodeFormValues {
	fn from(node: &Node) -> Self {
		Self {
			uuid: node.uuid.clone(),
			name: node.name.clone(),
			x_pos: node.x_pos,
			y_pos: node.y_pos,
			entry_node: node.entry_node,
			high_value_node: node.high_value_node,
			vulnerability: node.vulnerability,
		}
	}
}

impl NodeFormValues {
	/// The node record these values describe, with widget noise rounded off.
	pub fn to_node(&self) -> Node {
		Node {
			uuid: self.uuid.clone(),
			name: self.name.trim().to_owned(),
			x_pos: round_to(self.x_pos, POSITION_PLACES),
			y_pos: round_to(self.y_pos, POSITION_PLACES),
			entry_node: self.entry_node,
			high_value_node: self.high_value_node,
			vulnerability: round_to(self.vulnerability.clamp(0.0, 1.0), VULNERABILITY_PLACES),
		}
	}
}

pub fn round_to(value: f64, places: i32) -> f64 {
	let scale = 10f64.powi(places);
	(value * scale).round() / scale
}

#[derive(Debug, Default)]
pub struct NodeForm {
	displayed: Option<NodeFormValues>,
}

impl NodeForm {
	pub fn displayed(&self) -> Option<&NodeFormValues> {
		self.displayed.as_ref()
	}

	pub fn displayed_uuid(&self) -> Option<&str> {
		self.displayed.as_ref().map(|v| v.uuid.as_str())
	}

	pub fn show(&mut self, node: Option<&Node>) {
		self.displayed = node.map(NodeFormValues::from);
	}

	/// Re-read the displayed node after `change`. Returns true when the panel
	/// contents changed.
	pub fn refresh(&mut self, network: &Network, change: &NetworkChange) -> bool {
		let Some(uuid) = self.displayed_uuid() else {
			return false;
		};
		if !change.affects_node(uuid) {
			return false;
		}
		let next = network.get_node_by_id(uuid).map(NodeFormValues::from);
		if next.as_ref() == self.displayed.as_ref() {
			return false;
		}
		self.displayed = next;
		true
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case(0.123456789, 0.123457)]
	#[case(0.5, 0.5)]
	#[case(1.0000004, 1.0)]
	#[case(-0.2, 0.0)]
	fn vulnerability_rounds_to_six_places(#[case] input: f64, #[case] expected: f64) {
		let values = NodeFormValues {
			vulnerability: input,
			..Default::default()
		};
		assert_eq!(values.to_node().vulnerability, expected);
	}

	#[test]
	fn positions_round_to_two_places() {
		let values = NodeFormValues {
			x_pos: 10.004999,
			y_pos: -3.14159,
			..Default::default()
		};
		let node = values.to_node();
		assert_eq!((node.x_pos, node.y_pos), (10.0, -3.14));
	}

	#[test]
	fn refresh_ignores_other_nodes() {
		let mut network = Network::new();
		network.add_node(1.0, 1.0, 0, Some(Node::new("shown", "s", 0.0, 0.0))).unwrap();
		network.add_node(2.0, 2.0, 1, Some(Node::new("other", "o", 0.0, 0.0))).unwrap();

		let mut form = NodeForm::default();
		form.show(network.get_node_by_id("shown"));

		network.set_node_position("other", 10.0, 10.0).unwrap();
		assert!(!form.refresh(&network, &NetworkChange::NodeUpdated("other".into())));
		assert_eq!(form.displayed().unwrap().x_pos, 1.0);

		network.set_node_position("shown", 10.0, 10.0).unwrap();
		assert!(form.refresh(&network, &NetworkChange::NodeUpdated("shown".into())));
		let shown = form.displayed().unwrap();
		assert_eq!((shown.x_pos, shown.y_pos), (10.0, 10.0));
	}

	#[test]
	fn removal_clears_the_panel() {
		let mut network = Network::new();
		network.add_node(0.0, 0.0, 0, Some(Node::new("a", "a", 0.0, 0.0))).unwrap();
		let mut form = NodeForm::default();
		form.show(network.get_node_by_id("a"));
		network.remove_node("a");
		assert!(form.refresh(
			&network,
			&NetworkChange::NodeRemoved {
				uuid: "a".into(),
				edges: vec![]
			}
		));
		assert!(form.displayed().is_none());
	}
}
