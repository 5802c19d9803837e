use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};

use super::network_canvas::NetworkCanvas;
use super::node_properties::NodeProperties;
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::interaction::InteractionService;
use crate::network::{Network, NetworkJson};
use crate::sync::{BrowserTimers, DomBridge, HttpBackend, NetworkService, Outbound};

fn initial(raw: Option<&str>) -> Result<Network, EditorError> {
	match raw {
		Some(raw) => {
			let json: NetworkJson = raw.parse()?;
			Ok(Network::from_json(&json))
		}
		None => {
			info!("no initial network, starting empty");
			Ok(Network::new())
		}
	}
}

/// The canvas and properties panel over one live network.
///
/// A malformed initial network is returned as an error for the enclosing
/// error boundary to show.
#[component]
pub fn NetworkEditor(
	config: EditorConfig,
	initial_network: Option<String>,
) -> impl IntoView {
	initial(initial_network.as_deref()).map(move |network| {
		let backend = Rc::new(HttpBackend::new(config.save_url.clone(), config.layout_url.clone()));
		let service = NetworkService::new(
			network,
			backend,
			Rc::new(BrowserTimers::default()),
			config.save_debounce_ms,
		);
		let interaction = Rc::new(RefCell::new(InteractionService::new(service.clone())));

		// lives as long as this component's owner
		let bridge = match DomBridge::connect(&service) {
			Ok(bridge) => Some(bridge),
			Err(e) => {
				error!("page events unavailable: {e}");
				None
			}
		};
		let _bridge = StoredValue::new_local(bridge);
		service.bus().publish(&Outbound::NodeListChanged(service.nodes()));

		view! {
			<div class="network-editor">
				<NetworkCanvas
					service=service.clone()
					interaction=interaction.clone()
					fit_padding=config.fit_padding
					default_layout=config.default_layout.clone()
				/>
				<NodeProperties service=service interaction=interaction />
			</div>
		}
	})
}
