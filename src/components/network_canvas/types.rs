/// What a pointer landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
	Node(String),
	Edge(String),
	Background,
}

/// Pointer gestures reduced to the three things the editor cares about.
/// Coordinates are in graph space.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
	CanvasDoubleClicked { x: f64, y: f64 },
	Tapped(Target),
	NodeDragged { id: String, x: f64, y: f64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
	Node(String),
	Edge(String),
}

impl Selection {
	pub fn id(&self) -> &str {
		match self {
			Self::Node(id) | Self::Edge(id) => id,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPress {
	pub key: String,
	pub shift: bool,
	pub ctrl: bool,
	/// Typed into a form control or editable region, anywhere on the page.
	pub in_text_entry: bool,
}

impl KeyPress {
	#[cfg(test)]
	pub fn plain(key: &str) -> Self {
		Self {
			key: key.to_owned(),
			..Default::default()
		}
	}

	pub fn is_delete(&self) -> bool {
		matches!(self.key.as_str(), "Delete" | "Backspace")
	}
}

/// Whether an element with this tag takes typed input. Keys pressed there
/// belong to the element, not the graph.
pub fn is_text_entry(tag_name: &str, content_editable: bool) -> bool {
	content_editable
		|| ["INPUT", "TEXTAREA", "SELECT"]
			.iter()
			.any(|tag| tag.eq_ignore_ascii_case(tag_name))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::input("INPUT", false, true)]
	#[case::textarea("TEXTAREA", false, true)]
	#[case::select("select", false, true)]
	#[case::editable_div("DIV", true, true)]
	#[case::canvas("CANVAS", false, false)]
	#[case::body("BODY", false, false)]
	fn text_entry_targets(#[case] tag: &str, #[case] editable: bool, #[case] expected: bool) {
		assert_eq!(is_text_entry(tag, editable), expected);
	}
}
