//! Network-wide settings and metadata edits arriving as flat form payloads.

use crate::error::EditorError;
use crate::network::{DocumentMetadata, Node};

pub const OPERATION_KEY: &str = "operation";
pub const UPDATE_DETAILS: &str = "update-network-details";
pub const UPDATE_METADATA: &str = "update-network-metadata";

/// A settings form payload, split by its operation tag.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsUpdate {
	Details(NetworkSettings),
	Metadata(MetadataUpdate),
}

impl SettingsUpdate {
	pub fn from_form(form: &[(String, String)]) -> Result<Self, EditorError> {
		let operation = field(form, OPERATION_KEY).unwrap_or_default();
		match operation {
			UPDATE_DETAILS => Ok(Self::Details(NetworkSettings::from_form(form)?)),
			UPDATE_METADATA => Ok(Self::Metadata(MetadataUpdate::from_form(form))),
			other => Err(EditorError::invalid_field(OPERATION_KEY, other)),
		}
	}
}

/// When a randomisation flag is on, the matching node attribute is reset for
/// every node so the simulation can assign it later.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkSettings {
	pub randomise_vulnerabilities: bool,
	pub vulnerability_lower_bound: f64,
	pub randomise_entry_nodes: bool,
	pub randomise_high_value_nodes: bool,
}

impl NetworkSettings {
	pub fn from_form(form: &[(String, String)]) -> Result<Self, EditorError> {
		let lower = match field(form, "vulnerability_lower_bound") {
			None | Some("") => 0.0,
			Some(raw) => raw
				.trim()
				.parse::<f64>()
				.ok()
				.filter(|v| (0.0..=1.0).contains(v))
				.ok_or_else(|| EditorError::invalid_field("vulnerability_lower_bound", raw))?,
		};
		Ok(Self {
			randomise_vulnerabilities: flag(form, "randomise_vulnerabilities"),
			vulnerability_lower_bound: lower,
			randomise_entry_nodes: flag(form, "randomise_entry_nodes"),
			randomise_high_value_nodes: flag(form, "randomise_high_value_nodes"),
		})
	}

	pub fn is_noop(&self) -> bool {
		!(self.randomise_vulnerabilities
			|| self.randomise_entry_nodes
			|| self.randomise_high_value_nodes)
	}

	pub fn apply(&self, node: &mut Node) {
		if self.randomise_vulnerabilities {
			node.vulnerability = self.vulnerability_lower_bound;
		}
		if self.randomise_entry_nodes {
			node.entry_node = false;
		}
		if self.randomise_high_value_nodes {
			node.high_value_node = false;
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataUpdate {
	pub name: Option<String>,
	pub description: Option<String>,
	pub author: Option<String>,
	pub locked: bool,
}

impl MetadataUpdate {
	pub fn from_form(form: &[(String, String)]) -> Self {
		let text = |key| field(form, key).map(|v| v.trim().to_owned());
		Self {
			name: text("name"),
			description: text("description"),
			author: text("author"),
			locked: flag(form, "locked"),
		}
	}

	pub fn apply(&self, metadata: &DocumentMetadata) -> DocumentMetadata {
		let mut next = metadata.clone();
		if let Some(name) = &self.name {
			next.name = name.clone();
		}
		if let Some(description) = &self.description {
			next.description = description.clone();
		}
		if let Some(author) = &self.author {
			next.author = author.clone();
		}
		next.locked = self.locked;
		next.updated_at = Some(chrono::Utc::now().naive_utc());
		next
	}
}

fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
	form.iter()
		.rev()
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.as_str())
}

/// Checkbox semantics: present and not explicitly false.
fn flag(form: &[(String, String)], key: &str) -> bool {
	field(form, key).is_some_and(|v| !matches!(v.trim(), "" | "false" | "off" | "0"))
}
