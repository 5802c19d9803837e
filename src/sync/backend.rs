//! Persistence and layout over HTTP.

use leptos::task::spawn_local;
use log::{debug, error, info};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::error::EditorError;
use crate::network::{LayoutRequest, NetworkJson};

pub type LayoutCallback = Box<dyn FnOnce(Result<NetworkJson, EditorError>)>;

/// The server side of the editor. Saves are fire-and-forget; layout results
/// come back through `done`.
pub trait Backend {
	fn save(&self, network: NetworkJson);
	fn request_layout(&self, request: LayoutRequest, done: LayoutCallback);
}

#[derive(Clone, Debug, Default)]
pub struct HttpBackend {
	save_url: Option<String>,
	layout_url: Option<String>,
}

impl HttpBackend {
	pub fn new(save_url: Option<String>, layout_url: Option<String>) -> Self {
		Self {
			save_url,
			layout_url,
		}
	}
}

impl Backend for HttpBackend {
	fn save(&self, network: NetworkJson) {
		let Some(url) = self.save_url.clone() else {
			debug!("no save url configured, not saving");
			return;
		};
		spawn_local(async move {
			let result = match network.to_json_string() {
				Ok(body) => post_json(&url, body).await.map(|_| ()),
				Err(e) => Err(e),
			};
			if let Err(e) = result {
				error!("saving network failed: {e}");
			}
		});
	}

	fn request_layout(&self, request: LayoutRequest, done: LayoutCallback) {
		let Some(url) = self.layout_url.clone() else {
			done(Err(EditorError::Transport("no layout url configured".into())));
			return;
		};
		spawn_local(async move {
			done(fetch_layout(&url, &request).await);
		});
	}
}

async fn fetch_layout(url: &str, request: &LayoutRequest) -> Result<NetworkJson, EditorError> {
	let body = serde_json::to_string(request)?;
	let text = post_json(url, body).await?;
	let json: NetworkJson = text.parse()?;
	info!("layout {:?} returned {} nodes", request.layout, json.nodes.as_ref().map_or(0, |n| n.len()));
	Ok(json)
}

async fn post_json(url: &str, body: String) -> Result<String, EditorError> {
	let window = web_sys::window().ok_or_else(|| EditorError::Browser("no window".into()))?;

	let init = RequestInit::new();
	init.set_method("POST");
	init.set_mode(RequestMode::SameOrigin);
	init.set_body(&body.into());
	let request = Request::new_with_str_and_init(url, &init)?;
	request.headers().set("Content-Type", "application/json")?;

	let response: Response = JsFuture::from(window.fetch_with_request(&request))
		.await?
		.dyn_into()?;
	if !response.ok() {
		return Err(EditorError::Status {
			url: url.to_owned(),
			status: response.status(),
		});
	}
	let text = JsFuture::from(response.text()?).await?;
	Ok(text.as_string().unwrap_or_default())
}
