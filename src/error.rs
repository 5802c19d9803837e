//! Error types shared by the model, sync and page layers.

use thiserror::Error;

/// Why the graph model refused a mutation. A rejected mutation never changes
/// the network.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejected {
	#[error("node {0} already exists")]
	DuplicateNode(String),
	#[error("node {0} does not exist")]
	UnknownNode(String),
	#[error("cannot connect node {0} to itself")]
	SelfLoop(String),
	#[error("nodes {a} and {b} are already connected")]
	DuplicateEdge { a: String, b: String },
	#[error("edge {0} already exists")]
	DuplicateEdgeId(String),
	#[error("vulnerability {0} is outside [0, 1]")]
	VulnerabilityOutOfRange(f64),
}

/// Failures at the editor's outer boundary: external input, transport and
/// browser environment.
#[derive(Debug, Error)]
pub enum EditorError {
	#[error("malformed network json: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("invalid value {value:?} for field {field}")]
	InvalidField { field: String, value: String },
	#[error("request failed: {0}")]
	Transport(String),
	#[error("{url} responded with status {status}")]
	Status { url: String, status: u16 },
	#[error("browser environment: {0}")]
	Browser(String),
}

impl EditorError {
	pub(crate) fn invalid_field(field: &str, value: &str) -> Self {
		Self::InvalidField {
			field: field.to_owned(),
			value: value.to_owned(),
		}
	}
}

impl From<wasm_bindgen::JsValue> for EditorError {
	fn from(value: wasm_bindgen::JsValue) -> Self {
		Self::Transport(
			value
				.as_string()
				.unwrap_or_else(|| format!("{value:?}")),
		)
	}
}
