use leptos::prelude::*;

use crate::components::NetworkEditor;
use crate::config::{self, EditorConfig};

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	// both are handed over by the hosting page before the app mounts
	let config = EditorConfig::from_window();
	let initial_network = config::initial_network();

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<NetworkEditor config=config initial_network=initial_network />
				<div class="graph-overlay">
					<h1>"Network Editor"</h1>
					<p class="subtitle">
						"Double-click to add a node. Click two nodes to link them. Delete removes the selection."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
