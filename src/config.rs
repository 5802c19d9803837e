//! Editor configuration injected by the hosting page.

use log::warn;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

pub const CONFIG_GLOBAL: &str = "NETWORK_EDITOR_CONFIG";
pub const NETWORK_GLOBAL: &str = "NETWORK_JSON";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
	pub save_url: Option<String>,
	pub layout_url: Option<String>,
	pub save_debounce_ms: u32,
	/// Margin kept around the graph by "reset view".
	pub fit_padding: f64,
	pub default_layout: String,
}

impl Default for EditorConfig {
	fn default() -> Self {
		Self {
			save_url: None,
			layout_url: None,
			save_debounce_ms: 1000,
			fit_padding: 30.0,
			default_layout: "spring".into(),
		}
	}
}

impl EditorConfig {
	/// Read `window.NETWORK_EDITOR_CONFIG`, falling back to defaults.
	pub fn from_window() -> Self {
		let Some(raw) = read_global(CONFIG_GLOBAL) else {
			return Self::default();
		};
		serde_json::from_str(&raw).unwrap_or_else(|e| {
			warn!("ignoring malformed {CONFIG_GLOBAL}: {e}");
			Self::default()
		})
	}
}

/// The network the page was opened with, as JSON text.
pub fn initial_network() -> Option<String> {
	read_global(NETWORK_GLOBAL)
}

/// A global as JSON text. Strings are returned verbatim, objects stringified.
fn read_global(name: &str) -> Option<String> {
	let window = web_sys::window()?;
	let value = js_sys::Reflect::get(&window, &JsValue::from_str(name)).ok()?;
	if value.is_undefined() || value.is_null() {
		return None;
	}
	if let Some(text) = value.as_string() {
		return Some(text);
	}
	js_sys::JSON::stringify(&value).ok()?.as_string()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn partial_config_keeps_defaults() {
		let config: EditorConfig = serde_json::from_str(r#"{"save_url":"/api/network/save"}"#).unwrap();
		assert_eq!(
			config,
			EditorConfig {
				save_url: Some("/api/network/save".into()),
				..Default::default()
			}
		);
		assert_eq!(config.save_debounce_ms, 1000);
	}
}
