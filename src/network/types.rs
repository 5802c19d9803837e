use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A host or device in the network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub uuid: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub x_pos: f64,
	#[serde(default)]
	pub y_pos: f64,
	#[serde(default)]
	pub entry_node: bool,
	#[serde(default)]
	pub high_value_node: bool,
	#[serde(default)]
	pub vulnerability: f64,
}

impl Node {
	/// A plain node with default attributes at the given position.
	pub fn new(uuid: impl Into<String>, name: impl Into<String>, x: f64, y: f64) -> Self {
		Self {
			uuid: uuid.into(),
			name: name.into(),
			x_pos: x,
			y_pos: y,
			entry_node: false,
			high_value_node: false,
			vulnerability: 0.0,
		}
	}
}

/// An undirected link between two distinct nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
	pub edge_id: String,
	pub node_a: String,
	pub node_b: String,
}

impl Edge {
	pub fn new(
		edge_id: impl Into<String>,
		node_a: impl Into<String>,
		node_b: impl Into<String>,
	) -> Self {
		Self {
			edge_id: edge_id.into(),
			node_a: node_a.into(),
			node_b: node_b.into(),
		}
	}

	pub fn touches(&self, uuid: &str) -> bool {
		self.node_a == uuid || self.node_b == uuid
	}

	/// True when this edge joins `a` and `b` in either direction.
	pub fn connects(&self, a: &str, b: &str) -> bool {
		(self.node_a == a && self.node_b == b) || (self.node_a == b && self.node_b == a)
	}

	/// The endpoint opposite `uuid`, if `uuid` is an endpoint.
	pub fn other(&self, uuid: &str) -> Option<&str> {
		if self.node_a == uuid {
			Some(&self.node_b)
		} else if self.node_b == uuid {
			Some(&self.node_a)
		} else {
			None
		}
	}
}

/// Administrative record stored under `_doc_metadata`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
	#[serde(default)]
	pub uuid: String,
	#[serde(default, with = "timestamp")]
	pub created_at: Option<NaiveDateTime>,
	#[serde(default, with = "timestamp")]
	pub updated_at: Option<NaiveDateTime>,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub author: String,
	#[serde(default)]
	pub locked: bool,
}

/// ISO-8601 timestamps, with or without a UTC offset. Offsets are folded into
/// UTC on read; writes never carry one.
mod timestamp {
	use chrono::{DateTime, NaiveDateTime};
	use serde::{Deserialize, Deserializer, Serializer, de};

	const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

	pub fn serialize<S: Serializer>(
		value: &Option<NaiveDateTime>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match value {
			Some(at) => serializer.serialize_str(&at.format(FORMAT).to_string()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<NaiveDateTime>, D::Error> {
		let Some(raw) = Option::<String>::deserialize(deserializer)? else {
			return Ok(None);
		};
		if raw.is_empty() {
			return Ok(None);
		}
		if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
			return Ok(Some(at.naive_utc()));
		}
		NaiveDateTime::parse_from_str(&raw, FORMAT)
			.or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
			.map(Some)
			.map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
	}
}

/// What changed in a [`Network`](super::Network) mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkChange {
	NodeAdded(String),
	NodeUpdated(String),
	NodeRemoved { uuid: String, edges: Vec<String> },
	EdgeAdded(String),
	EdgeRemoved(String),
	/// Every node went through one batch transform.
	NodesUpdated,
	MetadataChanged,
	/// The whole network was replaced.
	Reloaded,
}

impl NetworkChange {
	/// Whether the node `uuid` may look different after this change.
	pub fn affects_node(&self, uuid: &str) -> bool {
		match self {
			Self::NodeAdded(id) | Self::NodeUpdated(id) => id == uuid,
			Self::NodeRemoved { uuid: id, .. } => id == uuid,
			Self::NodesUpdated | Self::Reloaded => true,
			Self::EdgeAdded(_) | Self::EdgeRemoved(_) | Self::MetadataChanged => false,
		}
	}
}
