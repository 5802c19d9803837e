//! Window custom events <-> editor signals.
//!
//! The surrounding page talks to the editor through `networkUpdate`,
//! `settingsUpdate`, `nodeSelected` and `nodeDeleted` events; the editor
//! answers with `nodeListChanged`, whose detail is the node array.

use log::error;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, Window};

use super::bus::{InboundSignal, Outbound};
use super::service::NetworkService;
use crate::error::EditorError;

pub const NETWORK_UPDATE: &str = "networkUpdate";
pub const SETTINGS_UPDATE: &str = "settingsUpdate";
pub const NODE_SELECTED: &str = "nodeSelected";
pub const NODE_DELETED: &str = "nodeDeleted";
pub const NODE_LIST_CHANGED: &str = "nodeListChanged";

/// Keeps the window listeners alive; dropping it detaches them.
pub struct DomBridge {
	window: Window,
	listeners: Vec<(&'static str, Closure<dyn FnMut(CustomEvent)>)>,
	subscription: usize,
	service: NetworkService,
}

impl DomBridge {
	pub fn connect(service: &NetworkService) -> Result<Self, EditorError> {
		let window = web_sys::window().ok_or_else(|| EditorError::Browser("no window".into()))?;
		let mut listeners = Vec::new();

		for name in [NETWORK_UPDATE, SETTINGS_UPDATE, NODE_SELECTED, NODE_DELETED] {
			let service = service.clone();
			let closure = Closure::<dyn FnMut(CustomEvent)>::new(move |ev: CustomEvent| {
				let Some(signal) = inbound_signal(name, &ev.detail()) else {
					error!("{name} event without a usable detail");
					return;
				};
				if let Err(e) = service.handle_inbound(signal) {
					error!("{name}: {e}");
					wasm_bindgen::throw_str(&e.to_string());
				}
			});
			window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
			listeners.push((name, closure));
		}

		let target = window.clone();
		let subscription = service.bus().subscribe(move |event| {
			if let Outbound::NodeListChanged(nodes) = event {
				if let Err(e) = dispatch_json(&target, NODE_LIST_CHANGED, nodes) {
					error!("dispatching {NODE_LIST_CHANGED}: {e}");
				}
			}
		});

		Ok(Self {
			window,
			listeners,
			subscription,
			service: service.clone(),
		})
	}
}

impl Drop for DomBridge {
	fn drop(&mut self) {
		for (name, closure) in &self.listeners {
			let _ = self
				.window
				.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
		}
		self.service.bus().unsubscribe(self.subscription);
	}
}

fn inbound_signal(name: &str, detail: &JsValue) -> Option<InboundSignal> {
	let text = detail.as_string();
	match name {
		NETWORK_UPDATE => {
			let raw = text.or_else(|| js_sys::JSON::stringify(detail).ok()?.as_string())?;
			Some(InboundSignal::NetworkReplaced(raw))
		}
		SETTINGS_UPDATE => {
			let raw = text.or_else(|| js_sys::JSON::stringify(detail).ok()?.as_string())?;
			let value: Value = serde_json::from_str(&raw).ok()?;
			Some(InboundSignal::SettingsChanged(form_pairs(&value)))
		}
		NODE_SELECTED => Some(InboundSignal::NodeSelected(text?)),
		NODE_DELETED => Some(InboundSignal::NodeDeleteRequested(text?)),
		_ => None,
	}
}

/// Flatten a form payload, either `{key: value}` or `[[key, value], ..]`,
/// into string pairs.
pub fn form_pairs(value: &Value) -> Vec<(String, String)> {
	let text = |v: &Value| match v {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	};
	match value {
		Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), text(v))).collect(),
		Value::Array(items) => items
			.iter()
			.filter_map(|item| match item.as_array()?.as_slice() {
				[Value::String(k), v] => Some((k.clone(), text(v))),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}

fn dispatch_json<T: serde::Serialize>(
	window: &Window,
	name: &str,
	detail: &T,
) -> Result<(), EditorError> {
	let detail = js_sys::JSON::parse(&serde_json::to_string(detail)?)?;
	let init = CustomEventInit::new();
	init.set_detail(&detail);
	let event = CustomEvent::new_with_event_init_dict(name, &init)?;
	window.dispatch_event(&event)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn object_payloads_flatten_to_strings() {
		let pairs = form_pairs(&json!({
			"operation": "update-network-details",
			"randomise_entry_nodes": true,
			"vulnerability_lower_bound": 0.25,
		}));
		assert_eq!(
			pairs,
			vec![
				("operation".to_owned(), "update-network-details".to_owned()),
				("randomise_entry_nodes".to_owned(), "true".to_owned()),
				("vulnerability_lower_bound".to_owned(), "0.25".to_owned()),
			]
		);
	}

	#[test]
	fn pair_list_payloads_are_accepted() {
		let pairs = form_pairs(&json!([["locked", "on"], ["bogus"], ["name", "lab"]]));
		assert_eq!(
			pairs,
			vec![
				("locked".to_owned(), "on".to_owned()),
				("name".to_owned(), "lab".to_owned()),
			]
		);
	}
}
