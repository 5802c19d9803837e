//! Wire shape of a saved network.
//!
//! Nodes are keyed by uuid. Edges use a symmetric adjacency map: every node
//! key lists each neighbour's uuid mapped to an empty object, so an undirected
//! edge appears once from each side.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{DocumentMetadata, Node};
use crate::error::EditorError;

pub type Adjacency = IndexMap<String, IndexMap<String, Map<String, Value>>>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkJson {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nodes: Option<IndexMap<String, Node>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub edges: Option<Adjacency>,
	#[serde(
		rename = "_doc_metadata",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub doc_metadata: Option<DocumentMetadata>,
	/// Keys this editor does not interpret, carried through unchanged.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl NetworkJson {
	pub fn to_json_string(&self) -> Result<String, EditorError> {
		Ok(serde_json::to_string(self)?)
	}

	/// Map layout coordinates from normalised `[0, 1]` space onto a canvas of
	/// `width` x `height` pixels.
	pub fn rescale(&mut self, width: f64, height: f64) {
		for node in self.nodes.iter_mut().flat_map(|nodes| nodes.values_mut()) {
			node.x_pos *= width;
			node.y_pos *= height;
		}
	}
}

impl FromStr for NetworkJson {
	type Err = EditorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(serde_json::from_str(s)?)
	}
}

/// Body of a layout request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutRequest {
	pub layout: String,
	pub network: NetworkJson,
}
