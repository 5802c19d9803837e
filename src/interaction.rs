//! Turns canvas gestures and key presses into graph edits.
//!
//! Selection moves between nothing, one node and one edge. Clicking a second
//! node while one is selected links the two. While a form field has focus,
//! keys never edit the graph.

use log::{debug, warn};

use crate::components::network_canvas::{CanvasEvent, KeyPress, Selection, Target};
use crate::error::Rejected;
use crate::sync::NetworkService;

pub struct InteractionService {
	service: NetworkService,
	selection: Option<Selection>,
	input_focused: bool,
}

impl InteractionService {
	pub fn new(service: NetworkService) -> Self {
		Self {
			service,
			selection: None,
			input_focused: false,
		}
	}

	pub fn selection(&self) -> Option<&Selection> {
		self.selection.as_ref()
	}

	pub fn input_focused(&self) -> bool {
		self.input_focused
	}

	pub fn set_input_focused(&mut self, focused: bool) {
		self.input_focused = focused;
	}

	pub fn handle_canvas_event(&mut self, event: CanvasEvent) {
		match event {
			CanvasEvent::CanvasDoubleClicked { x, y } => {
				if let Err(reason) = self.service.add_node_at(x, y) {
					warn!("could not add node: {reason}");
				}
				self.clear_selection();
			}
			CanvasEvent::Tapped(Target::Node(id)) => self.tap_node(id),
			CanvasEvent::Tapped(Target::Edge(id)) => {
				self.selection = Some(Selection::Edge(id));
				self.service.show_in_form(None);
			}
			CanvasEvent::Tapped(Target::Background) => self.clear_selection(),
			CanvasEvent::NodeDragged { id, x, y } => {
				if let Err(reason) = self.service.move_node(&id, x, y) {
					debug!("drag ignored: {reason}");
				}
			}
		}
	}

	fn clear_selection(&mut self) {
		self.selection = None;
		self.service.show_in_form(None);
	}

	fn tap_node(&mut self, id: String) {
		let previous = match &self.selection {
			Some(Selection::Node(previous)) => previous.clone(),
			_ => {
				self.service.show_in_form(Some(&id));
				self.selection = Some(Selection::Node(id));
				return;
			}
		};
		match self.service.connect(&previous, &id) {
			Ok(edge) => {
				debug!("linked {} and {}", edge.node_a, edge.node_b);
				self.clear_selection();
			}
			// the previous node went away underneath us; start over from this one
			Err(Rejected::UnknownNode(missing)) if missing == previous => {
				self.service.show_in_form(Some(&id));
				self.selection = Some(Selection::Node(id));
			}
			// already linked or the same node: selection stays as it was
			Err(reason) => debug!("not linking: {reason}"),
		}
	}

	/// Returns true when the key changed the graph.
	pub fn handle_key(&mut self, key: &KeyPress) -> bool {
		if self.input_focused || key.in_text_entry {
			return false;
		}
		if key.shift || key.ctrl {
			// modifier combinations are reserved
			return false;
		}
		if !key.is_delete() {
			return false;
		}
		let Some(selection) = self.selection.take() else {
			return false;
		};
		match selection {
			Selection::Node(id) => self.service.remove_node(&id).is_some(),
			Selection::Edge(id) => self.service.remove_edge(&id).is_some(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;
	use crate::network::{Network, Node};
	use crate::test_support::{ManualTimers, RecordingBackend};

	fn interaction() -> InteractionService {
		let mut network = Network::new();
		for (i, id) in ["a", "b", "c"].iter().enumerate() {
			network
				.add_node(i as f64, 0.0, i, Some(Node::new(*id, *id, 0.0, 0.0)))
				.unwrap();
		}
		let service = NetworkService::new(
			network,
			Rc::new(RecordingBackend::default()),
			Rc::new(ManualTimers::default()),
			1000,
		);
		InteractionService::new(service)
	}

	fn tap(target: Target) -> CanvasEvent {
		CanvasEvent::Tapped(target)
	}

	fn node(id: &str) -> Target {
		Target::Node(id.to_owned())
	}

	#[test]
	fn double_click_adds_unselected_node() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		it.handle_canvas_event(CanvasEvent::CanvasDoubleClicked { x: 7.0, y: 8.0 });
		assert_eq!(it.service.nodes().len(), 4);
		assert_eq!(it.selection(), None);
		let added = it.service.nodes().pop().unwrap();
		assert_eq!((added.x_pos, added.y_pos), (7.0, 8.0));
	}

	#[test]
	fn two_taps_link_nodes_and_clear_selection() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		assert_eq!(it.selection(), Some(&Selection::Node("a".into())));
		it.handle_canvas_event(tap(node("b")));
		assert_eq!(it.selection(), None);
		assert!(it.service.network().edge_between("b", "a").is_some());
	}

	#[rstest]
	#[case::same_node("a")]
	#[case::already_linked("b")]
	fn failed_link_keeps_selection(#[case] second: &str) {
		let mut it = interaction();
		it.service.connect("a", "b").unwrap();
		it.handle_canvas_event(tap(node("a")));
		it.handle_canvas_event(tap(node(second)));
		assert_eq!(it.selection(), Some(&Selection::Node("a".into())));
		assert_eq!(it.service.network().edges().len(), 1);
	}

	#[test]
	fn stale_selection_moves_to_tapped_node() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		it.service.remove_node("a");
		it.handle_canvas_event(tap(node("b")));
		assert_eq!(it.selection(), Some(&Selection::Node("b".into())));
	}

	#[test]
	fn background_tap_clears_everything() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("c")));
		assert_eq!(it.service.form_values().unwrap().uuid, "c");
		it.handle_canvas_event(tap(Target::Background));
		assert_eq!(it.selection(), None);
		assert_eq!(it.service.form_values(), None);
	}

	#[test]
	fn tapping_node_after_edge_selects_node() {
		let mut it = interaction();
		let edge = it.service.connect("a", "b").unwrap();
		it.handle_canvas_event(tap(Target::Edge(edge.edge_id.clone())));
		assert_eq!(it.selection(), Some(&Selection::Edge(edge.edge_id)));
		it.handle_canvas_event(tap(node("c")));
		assert_eq!(it.selection(), Some(&Selection::Node("c".into())));
		assert_eq!(it.service.network().edges().len(), 1);
	}

	#[test]
	fn delete_key_removes_selected_node_with_edges() {
		let mut it = interaction();
		it.service.connect("a", "b").unwrap();
		it.service.connect("a", "c").unwrap();
		it.handle_canvas_event(tap(node("a")));
		assert!(it.handle_key(&KeyPress::plain("Delete")));
		assert_eq!(it.service.nodes().len(), 2);
		assert!(it.service.network().edges().is_empty());
		assert_eq!(it.selection(), None);
	}

	#[test]
	fn backspace_removes_selected_edge() {
		let mut it = interaction();
		let edge = it.service.connect("a", "b").unwrap();
		it.handle_canvas_event(tap(Target::Edge(edge.edge_id)));
		assert!(it.handle_key(&KeyPress::plain("Backspace")));
		assert!(it.service.network().edges().is_empty());
		assert_eq!(it.service.nodes().len(), 3);
	}

	#[test]
	fn keys_are_ignored_while_typing() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		it.set_input_focused(true);
		assert!(!it.handle_key(&KeyPress::plain("Backspace")));
		assert_eq!(it.service.nodes().len(), 3);
		assert_eq!(it.selection(), Some(&Selection::Node("a".into())));
	}

	#[test]
	fn keys_typed_into_page_fields_are_ignored() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		let key = KeyPress {
			in_text_entry: true,
			..KeyPress::plain("Backspace")
		};
		assert!(!it.handle_key(&key));
		assert_eq!(it.service.nodes().len(), 3);
		assert_eq!(it.selection(), Some(&Selection::Node("a".into())));
	}

	#[test]
	fn linking_empties_the_properties_panel() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		assert_eq!(it.service.form_values().unwrap().uuid, "a");
		it.handle_canvas_event(tap(node("b")));
		assert_eq!(it.service.form_values(), None);
	}

	#[test]
	fn double_click_empties_the_properties_panel() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("c")));
		it.handle_canvas_event(CanvasEvent::CanvasDoubleClicked { x: 1.0, y: 1.0 });
		assert_eq!(it.service.form_values(), None);
	}

	#[test]
	fn modified_keys_are_reserved() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("a")));
		let key = KeyPress {
			key: "Delete".into(),
			shift: true,
			..Default::default()
		};
		assert!(!it.handle_key(&key));
		assert_eq!(it.service.nodes().len(), 3);
	}

	#[test]
	fn drag_moves_node_regardless_of_selection() {
		let mut it = interaction();
		it.handle_canvas_event(tap(node("b")));
		it.handle_canvas_event(CanvasEvent::NodeDragged {
			id: "a".into(),
			x: 10.0,
			y: 10.0,
		});
		let a = it.service.network().get_node_by_id("a").cloned().unwrap();
		assert_eq!((a.x_pos, a.y_pos), (10.0, 10.0));
		assert_eq!(it.selection(), Some(&Selection::Node("b".into())));
		let shown = it.service.form_values().unwrap();
		assert_eq!((shown.x_pos, shown.y_pos), (1.0, 0.0));
	}
}
